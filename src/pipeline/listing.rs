//! Paginated listing retrieval
//!
//! The listing endpoint takes a JSON search request and answers with one page
//! of project summaries plus, usually, the total number of matches.

use crate::record::SummaryRecord;
use crate::FetchError;
use crate::pipeline::client::{classify_status, classify_transport_error};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

/// Largest page the listing service honours
pub const MAX_PAGE_SIZE: u32 = 15;

/// One page of listing results
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    /// 1-based page number
    pub page: u32,

    pub records: Vec<SummaryRecord>,

    /// Whether another page should be requested
    pub has_more: bool,

    /// The requested page size was above the service limit and got clamped
    pub truncated: bool,

    /// Total matches reported by the service, if any
    pub total_records: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    page_number: u32,
    page_size: u32,
    sort_column: &'a str,
    sort_direction: &'a str,
    filters: serde_json::Map<String, Value>,
}

/// Clamps a requested page size to the service limit
///
/// Returns the effective size and whether clamping happened.
pub fn clamp_page_size(requested: u32) -> (u32, bool) {
    if requested > MAX_PAGE_SIZE {
        (MAX_PAGE_SIZE, true)
    } else {
        (requested.max(1), false)
    }
}

/// Fetches listing pages from the search endpoint
#[derive(Debug, Clone)]
pub struct ListingFetcher {
    client: Client,
    url: String,
}

impl ListingFetcher {
    pub fn new(client: Client, listing_url: impl Into<String>) -> Self {
        Self {
            client,
            url: listing_url.into(),
        }
    }

    /// Fetches one page, newest projects first
    ///
    /// # Arguments
    ///
    /// * `page_index` - 1-based page number
    /// * `page_size` - Requested page size; clamped to `MAX_PAGE_SIZE`
    ///
    /// # Returns
    ///
    /// * `Ok(ListingPage)` - Page fetched and decoded
    /// * `Err(FetchError::Transient)` - Network failure, timeout, 5xx or 429
    /// * `Err(FetchError::Fatal)` - Other HTTP error or an undecodable body
    pub async fn fetch_page(
        &self,
        page_index: u32,
        page_size: u32,
    ) -> Result<ListingPage, FetchError> {
        let (page_size, truncated) = clamp_page_size(page_size);
        if truncated {
            tracing::warn!(
                "Requested page size exceeds the service limit, using {}",
                MAX_PAGE_SIZE
            );
        }

        let request = SearchRequest {
            page_number: page_index,
            page_size,
            sort_column: "ProjectCreatedOn",
            sort_direction: "desc",
            filters: serde_json::Map::new(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport_error(&self.url, &e))?;

        classify_status(&self.url, response.status())?;

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&self.url, &e))?;

        let mut page = parse_listing(&self.url, page_index, page_size, &body)?;
        page.truncated = truncated;

        tracing::debug!(
            "Listing page {} returned {} records (has_more: {})",
            page_index,
            page.records.len(),
            page.has_more
        );

        Ok(page)
    }
}

/// Decodes a listing response body
///
/// Entries without a project number are skipped with a warning. A body that
/// is not JSON or has no `data` array is a fatal error.
pub fn parse_listing(
    url: &str,
    page_index: u32,
    page_size: u32,
    body: &str,
) -> Result<ListingPage, FetchError> {
    let fatal = |reason: String| FetchError::Fatal {
        url: url.to_string(),
        reason,
    };

    let value: Value =
        serde_json::from_str(body).map_err(|e| fatal(format!("invalid listing JSON: {}", e)))?;

    let entries = value
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| fatal("listing response has no data array".to_string()))?;

    let total_records = value.get("totalRecords").and_then(Value::as_u64);

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        match SummaryRecord::from_listing_entry(entry) {
            Some(record) => records.push(record),
            None => tracing::warn!(
                "Skipping listing entry without a project number on page {}",
                page_index
            ),
        }
    }

    let has_more = compute_has_more(page_index, page_size, entries.len(), total_records);

    Ok(ListingPage {
        page: page_index,
        records,
        has_more,
        truncated: false,
        total_records,
    })
}

/// Decides whether a page is followed by another
///
/// `received` counts raw entries, including ones skipped for lacking an
/// identifier, so offsets line up with the service's own counting.
fn compute_has_more(
    page_index: u32,
    page_size: u32,
    received: usize,
    total_records: Option<u64>,
) -> bool {
    if received == 0 {
        return false;
    }

    match total_records {
        Some(total) => {
            let seen = u64::from(page_index.saturating_sub(1)) * u64::from(page_size)
                + received as u64;
            seen < total
        }
        None => received as u64 == u64::from(page_size),
    }
}
