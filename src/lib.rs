//! TABS-Harvest: a polite construction project harvester
//!
//! This crate pages through the TDLR TABS project search, enriches every
//! listed project from its detail page and upserts the result into a local
//! SQLite store, keyed by project number so repeated runs never duplicate rows.

pub mod config;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for TABS-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Listing endpoint unreachable on page {page}: {source}")]
    ListingUnreachable { page: u32, source: FetchError },

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PipelinePhase,
        to: state::PipelinePhase,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while talking to the remote listing service
///
/// The variant decides what the pipeline does with the failure: transient
/// errors go through the retry policy, everything else is terminal for the
/// request that produced it.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("transient failure fetching {url}: {reason}")]
    Transient { url: String, reason: String },

    #[error("fatal failure fetching {url}: {reason}")]
    Fatal { url: String, reason: String },

    #[error("detail page for {identifier} does not match the expected layout: {reason}")]
    Parse { identifier: String, reason: String },
}

impl FetchError {
    /// Returns true if a later attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Classifies the error for run statistics
    pub fn kind(&self) -> state::FailureKind {
        match self {
            Self::Transient { .. } => state::FailureKind::Transient,
            Self::Fatal { .. } => state::FailureKind::Fetch,
            Self::Parse { .. } => state::FailureKind::Parse,
        }
    }
}

/// Result type alias for TABS-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{run_scrape, Pipeline};
pub use record::{EnrichedRecord, Field, SummaryRecord};
pub use state::{PipelinePhase, RunState, RunStatistics};
pub use storage::{RecordStore, SqliteStore};
