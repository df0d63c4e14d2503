use serde::{Deserialize, Serialize};

/// Main configuration structure for TABS-Harvest
///
/// Every section has defaults that target the public TDLR TABS service, so an
/// empty file (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub client: ClientConfig,
    pub scrape: ScrapeConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,
}

/// Remote endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourceConfig {
    /// JSON search endpoint that returns paginated project summaries
    pub listing_url: String,

    /// Base URL of the HTML detail pages; the project number is appended
    pub detail_url: String,

    /// Referer sent with every request
    pub referer: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://www.tdlr.texas.gov/TABS/Search/SearchProjects".to_string(),
            detail_url: "https://www.tdlr.texas.gov/TABS/Search/Project/".to_string(),
            referer: "https://www.tdlr.texas.gov/TABS/search".to_string(),
        }
    }
}

/// HTTP client identity and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientConfig {
    /// Browser-like identity string sent as User-Agent
    pub user_agent: String,

    /// Total request timeout (seconds)
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Scrape run behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScrapeConfig {
    /// Records requested per listing page (the service caps this at 15)
    pub page_size: u32,

    /// Minimum time between successive request starts (milliseconds)
    pub delay_ms: u64,

    /// Maximum number of detail fetches in flight
    pub max_concurrency: u32,

    /// Stop after this many records have been attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_records: Option<u64>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            page_size: 15,
            delay_ms: 500,
            max_concurrency: 10,
            max_records: None,
        }
    }
}

/// Backoff shape between retry attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Retry policy for transient failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts per request, including the first one
    pub max_attempts: u32,

    /// Backoff shape
    pub backoff: BackoffKind,

    /// Delay before the first retry (milliseconds)
    pub base_delay_ms: u64,

    /// Upper bound for exponential backoff (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffKind::Exponential,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "tdlr_projects.db".to_string(),
        }
    }
}
