//! Storage module for persisting harvested projects
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Idempotent project upserts keyed by project number
//! - Free-text search over stored projects
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{RecordStore, StoreError, StoreResult};

use std::fmt;
use std::path::Path;

/// Opens or creates a record store database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully opened store
/// * `Err(StoreError)` - Failed to open or initialize the database
pub fn open_store(path: &Path) -> StoreResult<SqliteStore> {
    SqliteStore::new(path)
}

/// What an upsert did to the stored row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    Stale,
}

/// Represents a scrape run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_fetched: u32,
    pub records_attempted: u64,
    pub records_stored: u64,
    pub records_failed: u64,
    pub retries: u64,
    pub aborted_reason: Option<String>,
}

/// Status of a scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Aborted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "aborted" => Some(Self::Aborted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
