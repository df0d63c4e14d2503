//! Configuration module for TABS-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All keys are optional; command-line flags are layered on top by the binary.
//!
//! # Example
//!
//! ```no_run
//! use tabs_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Page size: {}", config.scrape.page_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffKind, ClientConfig, Config, OutputConfig, RetryConfig, ScrapeConfig, SourceConfig,
};

// Re-export parser functions
pub use parser::{config_fingerprint, load_config};
pub use validation::validate;
