//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and
//! associated error types.

use crate::record::EnrichedRecord;
use crate::state::RunStatistics;
use crate::storage::{RunRecord, RunStatus, UpsertOutcome};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for record store implementations
///
/// The store is keyed by project number. Writes follow last-write-wins on the
/// scrape timestamp: an upsert older than the stored row leaves it untouched.
pub trait RecordStore {
    // ===== Records =====

    /// Inserts a record or fully replaces the stored one
    ///
    /// # Returns
    ///
    /// * `Inserted` - No row existed for the identifier
    /// * `Replaced` - The stored row was overwritten
    /// * `Stale` - The stored row is newer; nothing was written
    fn upsert(&mut self, record: &EnrichedRecord) -> StoreResult<UpsertOutcome>;

    /// Gets a record by project number
    fn get(&self, identifier: &str) -> StoreResult<Option<EnrichedRecord>>;

    /// Case-insensitive substring search over project number, name,
    /// facility name, city and county, newest registration first
    fn search(&self, query: &str, limit: usize) -> StoreResult<Vec<EnrichedRecord>>;

    /// Counts stored records
    fn count(&self) -> StoreResult<u64>;

    // ===== Run Management =====

    /// Creates a new run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Fingerprint of the effective configuration
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64>;

    /// Marks a run finished with its final status and counters
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        stats: &RunStatistics,
    ) -> StoreResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StoreResult<RunRecord>;

    /// Gets the most recent runs, newest first
    fn recent_runs(&self, limit: usize) -> StoreResult<Vec<RunRecord>>;
}
