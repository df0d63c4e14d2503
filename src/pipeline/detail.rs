//! Detail page retrieval
//!
//! Fetches the HTML detail page of one project and hands it to the parser.

use crate::pipeline::client::{classify_status, classify_transport_error};
use crate::pipeline::parser::parse_detail_page;
use crate::record::{EnrichedRecord, Field, SummaryRecord};
use crate::{ConfigError, FetchError};
use chrono::Utc;
use reqwest::Client;
use url::Url;

/// Fetches and parses project detail pages
#[derive(Debug, Clone)]
pub struct DetailFetcher {
    client: Client,
    base: Url,
}

impl DetailFetcher {
    /// Creates a fetcher for detail pages under `detail_url`
    ///
    /// The project number is appended as the last path segment.
    pub fn new(client: Client, detail_url: &str) -> Result<Self, ConfigError> {
        let mut base = Url::parse(detail_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", detail_url, e)))?;

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { client, base })
    }

    /// Detail page URL for a project number
    ///
    /// The identifier always becomes exactly one percent-encoded path
    /// segment under the base, whatever characters it contains.
    pub fn detail_url(&self, identifier: &str) -> Result<Url, FetchError> {
        let invalid = |reason: &str| FetchError::Fatal {
            url: self.base.to_string(),
            reason: format!("cannot build detail URL for {:?}: {}", identifier, reason),
        };

        if identifier.is_empty() || identifier == "." || identifier == ".." {
            return Err(invalid("not a usable path segment"));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| invalid("base URL cannot take path segments"))?
            .pop_if_empty()
            .push(identifier);
        Ok(url)
    }

    /// Fetches the detail page of `summary` and parses it
    ///
    /// # Returns
    ///
    /// * `Ok(EnrichedRecord)` - Page fetched and parsed
    /// * `Err(FetchError::Transient)` - Network failure, timeout, 5xx or 429
    /// * `Err(FetchError::Fatal)` - 404 or another client error
    /// * `Err(FetchError::Parse)` - Page does not look like a project page
    pub async fn fetch_detail(&self, summary: &SummaryRecord) -> Result<EnrichedRecord, FetchError> {
        let url = self.detail_url(summary.identifier())?;
        let url_text = url.to_string();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(&url_text, &e))?;

        classify_status(&url_text, response.status())?;

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&url_text, &e))?;

        let mut record = parse_detail_page(summary.identifier(), &body, Utc::now())?;
        fill_from_summary(&mut record, summary);

        tracing::debug!("Parsed detail page for {}", summary.identifier());
        Ok(record)
    }
}

/// Carries listing attributes over to fields the detail page did not provide
fn fill_from_summary(record: &mut EnrichedRecord, summary: &SummaryRecord) {
    if record.project_id.is_unknown() {
        record.project_id = Field::from(summary.project_id.clone());
    }
    if record.project_name.is_unknown() {
        record.project_name = Field::from(summary.project_name.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary() -> SummaryRecord {
        SummaryRecord::from_listing_entry(&json!({
            "ProjectNumber": "TABS2026012633",
            "ProjectId": 991,
            "ProjectName": "Listing Name"
        }))
        .unwrap()
    }

    #[test]
    fn test_detail_url_appends_identifier() {
        let fetcher = DetailFetcher::new(
            Client::new(),
            "https://www.tdlr.texas.gov/TABS/Search/Project",
        )
        .unwrap();
        assert_eq!(
            fetcher.detail_url("TABS2026012633").unwrap().as_str(),
            "https://www.tdlr.texas.gov/TABS/Search/Project/TABS2026012633"
        );

        let with_slash = DetailFetcher::new(Client::new(), "http://localhost:9000/detail/").unwrap();
        assert_eq!(
            with_slash.detail_url("TABS1").unwrap().as_str(),
            "http://localhost:9000/detail/TABS1"
        );
    }

    #[test]
    fn test_detail_url_keeps_identifier_in_one_segment() {
        let fetcher = DetailFetcher::new(Client::new(), "https://host/TABS/Search/Project").unwrap();
        let url = |id: &str| fetcher.detail_url(id).unwrap().to_string();

        assert_eq!(url("A/B"), "https://host/TABS/Search/Project/A%2FB");
        assert_eq!(url("../../admin"), "https://host/TABS/Search/Project/..%2F..%2Fadmin");
        assert_eq!(url("A?b"), "https://host/TABS/Search/Project/A%3Fb");
        assert_eq!(url("A#b"), "https://host/TABS/Search/Project/A%23b");
        assert_eq!(url("x:y"), "https://host/TABS/Search/Project/x:y");

        let parsed = fetcher.detail_url("x:y").unwrap();
        assert_eq!(parsed.scheme(), "https");
        assert_eq!(parsed.host_str(), Some("host"));
        assert!(parsed.query().is_none());
        assert!(parsed.fragment().is_none());
    }

    #[test]
    fn test_detail_url_rejects_dot_segments() {
        let fetcher = DetailFetcher::new(Client::new(), "https://host/TABS/Search/Project/").unwrap();

        for id in ["", ".", ".."] {
            assert!(matches!(fetcher.detail_url(id), Err(FetchError::Fatal { .. })));
        }
    }

    #[test]
    fn test_invalid_detail_url() {
        let result = DetailFetcher::new(Client::new(), "not a url");
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_fill_from_summary_keeps_page_values() {
        let mut record = EnrichedRecord::unknown("TABS2026012633", Utc::now());
        record.project_name = Field::Known("Page Name".to_string());

        fill_from_summary(&mut record, &summary());

        assert_eq!(record.project_id, Field::Known("991".to_string()));
        assert_eq!(record.project_name, Field::Known("Page Name".to_string()));
    }

    #[test]
    fn test_fill_from_summary_uses_listing_name() {
        let mut record = EnrichedRecord::unknown("TABS2026012633", Utc::now());
        fill_from_summary(&mut record, &summary());
        assert_eq!(record.project_name, Field::Known("Listing Name".to_string()));
    }
}
