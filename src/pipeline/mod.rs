//! Acquisition pipeline
//!
//! This module contains the core scraping logic, including:
//! - Paginated listing retrieval
//! - Detail page fetching and parsing
//! - Rate-limited, retrying dispatch of detail fetches
//! - Overall run coordination

mod client;
mod coordinator;
mod detail;
mod dispatcher;
mod listing;
mod parser;
mod retry;

pub use client::{build_http_client, classify_status};
pub use coordinator::Pipeline;
pub use detail::DetailFetcher;
pub use dispatcher::{Dispatcher, Pacer, TaskError, TaskHandle, TaskOutcome};
pub use listing::{clamp_page_size, parse_listing, ListingFetcher, ListingPage, MAX_PAGE_SIZE};
pub use parser::{parse_detail_page, DETAIL_LABELS};
pub use retry::{Backoff, Retried, RetryPolicy};

use crate::config::Config;
use crate::state::RunStatistics;
use crate::storage::open_store;
use crate::Result;
use std::path::Path;

/// Runs a complete scrape
///
/// This is the main entry point for a scrape run. It will:
/// 1. Open (or create) the SQLite store
/// 2. Build the HTTP client and pipeline
/// 3. Page through the listing and enrich every project
/// 4. Record the run and return its statistics
///
/// # Arguments
///
/// * `config` - The effective configuration
///
/// # Returns
///
/// * `Ok(RunStatistics)` - The run completed (possibly with per-record failures)
/// * `Err(HarvestError)` - The store could not be opened or the listing was unreachable
pub async fn run_scrape(config: &Config) -> Result<RunStatistics> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let mut pipeline = Pipeline::new(config, store)?;
    pipeline.run().await
}
