use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Missing sections and keys fall back to their defaults.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let config: Config = toml::from_str(&content)?;

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 fingerprint of the effective configuration
///
/// The configuration is serialized back to TOML first, so the fingerprint
/// covers defaults and command-line overrides as well as file contents.
/// It is recorded with each run to tell runs with different settings apart.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash
/// * `Err(ConfigError)` - The configuration could not be serialized
pub fn config_fingerprint(config: &Config) -> Result<String, ConfigError> {
    let canonical = toml::to_string(config)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackoffKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[source]
listing-url = "https://example.com/api/search"
detail-url = "https://example.com/project/"

[client]
user-agent = "Mozilla/5.0 (X11; Linux x86_64)"
timeout-secs = 15

[scrape]
page-size = 10
delay-ms = 250
max-concurrency = 4
max-records = 100

[retry]
max-attempts = 5
backoff = "fixed"
base-delay-ms = 100

[output]
database-path = "./projects.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.source.listing_url, "https://example.com/api/search");
        assert_eq!(config.client.timeout_secs, 15);
        assert_eq!(config.client.connect_timeout_secs, 10);
        assert_eq!(config.scrape.page_size, 10);
        assert_eq!(config.scrape.max_concurrency, 4);
        assert_eq!(config.scrape.max_records, Some(100));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff, BackoffKind::Fixed);
        assert_eq!(config.output.database_path, "./projects.db");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.scrape.page_size, 15);
        assert_eq!(config.scrape.max_concurrency, 10);
        assert_eq!(config.scrape.max_records, None);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.source.listing_url.contains("SearchProjects"));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[scrape]\nmax-concurrency = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let config = Config::default();
        let first = config_fingerprint(&config).unwrap();
        let second = config_fingerprint(&config).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_overrides() {
        let base = Config::default();
        let mut capped = Config::default();
        capped.scrape.max_records = Some(50);

        assert_ne!(
            config_fingerprint(&base).unwrap(),
            config_fingerprint(&capped).unwrap()
        );
    }
}
