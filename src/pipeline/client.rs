//! HTTP client construction and response classification
//!
//! Every request to the remote service goes through one shared client that
//! carries the browser-like identity headers. Failures are classified here so
//! listing and detail fetches agree on what is worth retrying.

use crate::config::{ClientConfig, SourceConfig};
use crate::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Accept header sent with every request
const ACCEPT_VALUE: &str = "application/json, text/plain, */*";

/// Builds the shared HTTP client
///
/// # Arguments
///
/// * `client` - Identity and timeout settings
/// * `source` - Remote endpoints (for the Referer header)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (e.g. invalid header value)
pub fn build_http_client(
    client: &ClientConfig,
    source: &SourceConfig,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    if let Ok(referer) = HeaderValue::from_str(&source.referer) {
        headers.insert(REFERER, referer);
    } else {
        tracing::warn!("Ignoring referer that is not a valid header value: {}", source.referer);
    }

    Client::builder()
        .user_agent(client.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(client.timeout_secs))
        .connect_timeout(Duration::from_secs(client.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a non-success status to a fetch error
///
/// | Status | Classification |
/// |--------|----------------|
/// | 2xx | Ok |
/// | 408, 429, 5xx | Transient |
/// | 404 and other 4xx | Fatal |
pub fn classify_status(url: &str, status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }

    let reason = format!("HTTP {}", status.as_u16());
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        Err(FetchError::Transient {
            url: url.to_string(),
            reason,
        })
    } else {
        Err(FetchError::Fatal {
            url: url.to_string(),
            reason,
        })
    }
}

/// Classifies a transport-level error
///
/// Timeouts, connection failures and interrupted bodies are transient;
/// anything else (a malformed request, a redirect loop) is not.
pub fn classify_transport_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        FetchError::Transient {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else if let Some(status) = error.status() {
        classify_status(url, status).err().unwrap_or(FetchError::Fatal {
            url: url.to_string(),
            reason: error.to_string(),
        })
    } else {
        FetchError::Fatal {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}
