use crate::config::types::{ClientConfig, Config, OutputConfig, RetryConfig, ScrapeConfig, SourceConfig};
use crate::pipeline::MAX_PAGE_SIZE;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_client_config(&config.client)?;
    validate_scrape_config(&config.scrape)?;
    validate_retry_config(&config.retry)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates remote endpoint URLs
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    validate_http_url("listing-url", &config.listing_url)?;
    validate_http_url("detail-url", &config.detail_url)?;
    validate_http_url("referer", &config.referer)?;
    Ok(())
}

/// Validates client identity and timeouts
fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got timeout-secs={} connect-timeout-secs={}",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates scrape behavior
///
/// A page size above the service maximum is accepted here; the listing
/// fetcher clamps it and reports the truncation.
fn validate_scrape_config(config: &ScrapeConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 {
        return Err(ConfigError::Validation(
            "page-size must be >= 1, got 0".to_string(),
        ));
    }

    if config.page_size > MAX_PAGE_SIZE {
        tracing::warn!(
            "page-size {} exceeds the service maximum of {}; pages will be clamped",
            config.page_size,
            MAX_PAGE_SIZE
        );
    }

    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.max_records == Some(0) {
        return Err(ConfigError::Validation(
            "max-records must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the retry policy
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.max_delay_ms < config.base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max-delay-ms ({}) must be >= base-delay-ms ({})",
            config.max_delay_ms, config.base_delay_ms
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a URL parses and uses an HTTP(S) scheme
fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", key, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            key, value
        )));
    }

    Ok(())
}
