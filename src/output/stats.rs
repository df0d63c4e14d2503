//! Statistics reporting
//!
//! This module renders the statistics of a finished scrape run and the
//! summary of a store shown by the `stats` command.

use crate::state::RunStatistics;
use crate::storage::{RecordStore, RunRecord, StoreResult};
use std::fmt::Write;

/// Number of runs shown by the `stats` command
const RECENT_RUNS: usize = 10;

/// Summary of a record store
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Number of stored projects
    pub total_records: u64,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from a store
///
/// # Arguments
///
/// * `store` - The store to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(StoreError)` - Failed to query the store
pub fn load_statistics(store: &dyn RecordStore) -> StoreResult<StoreStatistics> {
    Ok(StoreStatistics {
        total_records: store.count()?,
        recent_runs: store.recent_runs(RECENT_RUNS)?,
    })
}

/// Renders the statistics of one run
pub fn format_run_statistics(stats: &RunStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Scrape Statistics ===\n");
    let _ = writeln!(out, "Pages fetched: {}", stats.pages_fetched);
    let _ = writeln!(out, "Records attempted: {}", stats.records_attempted);
    let _ = writeln!(
        out,
        "Records stored: {} ({} new, {} updated)",
        stats.records_stored, stats.records_new, stats.records_updated
    );
    let _ = writeln!(out, "Records failed: {}", stats.records_failed);

    for (kind, count) in stats.failures.non_zero() {
        let _ = writeln!(out, "  {}: {}", kind, count);
    }

    let _ = writeln!(out, "Retries: {}", stats.retries);
    let _ = writeln!(out, "Elapsed: {:.1}s", stats.elapsed.as_secs_f64());

    if let Some(reason) = &stats.aborted {
        let _ = writeln!(out, "\nPaging stopped early: {}", reason);
    }

    out
}

/// Prints run statistics to stdout
pub fn print_run_statistics(stats: &RunStatistics) {
    print!("{}", format_run_statistics(stats));
}

/// Renders a store summary
pub fn format_statistics(stats: &StoreStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Database Statistics ===\n");
    let _ = writeln!(out, "Stored projects: {}", stats.total_records);

    if stats.recent_runs.is_empty() {
        let _ = writeln!(out, "\nNo scrape runs recorded");
        return out;
    }

    let _ = writeln!(out, "\nRecent Runs:");
    for run in &stats.recent_runs {
        let _ = writeln!(
            out,
            "  #{} {} [{}] attempted {}, stored {}, failed {}, retries {}",
            run.id,
            run.started_at,
            run.status,
            run.records_attempted,
            run.records_stored,
            run.records_failed,
            run.retries
        );
        if let Some(reason) = &run.aborted_reason {
            let _ = writeln!(out, "      stopped early: {}", reason);
        }
    }

    out
}

/// Prints a store summary to stdout
pub fn print_statistics(stats: &StoreStatistics) {
    print!("{}", format_statistics(stats));
}
