//! Output module for run reports and search results
//!
//! This module handles:
//! - Rendering the statistics of a scrape run
//! - Summarizing the contents of a store
//! - Formatting search results

pub mod search;
pub mod stats;

pub use search::format_search_results;
pub use stats::{
    format_run_statistics, format_statistics, load_statistics, print_run_statistics,
    print_statistics, StoreStatistics,
};
