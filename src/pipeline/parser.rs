//! Detail page parser
//!
//! Detail pages are label/value layouts. The page text is flattened into
//! trimmed, non-empty lines and each field is found by its label:
//!
//! - `Label: value` on one line yields `value`
//! - `Label:` alone on a line yields the following line
//!
//! Parsing is pure; fetching lives in the detail module.

use crate::record::{EnrichedRecord, Field};
use crate::FetchError;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use scraper::{Html, Node};
use std::sync::OnceLock;

const PROJECT_NAME: &str = "Project Name:";
const FACILITY_NAME: &str = "Facility Name:";
const LOCATION_ADDRESS: &str = "Location Address:";
const LOCATION_COUNTY: &str = "Location County:";
const START_DATE: &str = "Start Date:";
const COMPLETION_DATE: &str = "Completion Date:";
const ESTIMATED_COST: &str = "Estimated Cost:";
const TYPE_OF_WORK: &str = "Type of Work:";
const TYPE_OF_FUNDS: &str = "Type of Funds:";
const SCOPE_OF_WORK: &str = "Scope of Work:";
const SQUARE_FOOTAGE: &str = "Square Footage:";
const CURRENT_STATUS: &str = "Current Status:";
const OWNER_NAME: &str = "Owner Name:";
const OWNER_ADDRESS: &str = "Owner Address:";
const OWNER_PHONE: &str = "Owner Phone:";
const DESIGN_FIRM_NAME: &str = "Design Firm Name:";
const DESIGN_FIRM_ADDRESS: &str = "Design Firm Address:";
const RAS_NAME: &str = "RAS Name:";
const RAS_NUMBER: &str = "RAS #:";
const REGISTRATION_DATE: &str = "Registration Date:";

/// Every label a detail page may carry
pub const DETAIL_LABELS: [&str; 20] = [
    PROJECT_NAME,
    FACILITY_NAME,
    LOCATION_ADDRESS,
    LOCATION_COUNTY,
    START_DATE,
    COMPLETION_DATE,
    ESTIMATED_COST,
    TYPE_OF_WORK,
    TYPE_OF_FUNDS,
    SCOPE_OF_WORK,
    SQUARE_FOOTAGE,
    CURRENT_STATUS,
    OWNER_NAME,
    OWNER_ADDRESS,
    OWNER_PHONE,
    DESIGN_FIRM_NAME,
    DESIGN_FIRM_ADDRESS,
    RAS_NAME,
    RAS_NUMBER,
    REGISTRATION_DATE,
];

/// Words dropped when deriving a city from an address segment
const STREET_WORDS: [&str; 6] = ["St", "Street", "Ave", "Avenue", "Rd", "Road"];

/// Parses a detail page into an enriched record
///
/// # Arguments
///
/// * `identifier` - Project number the page belongs to
/// * `html` - Raw page body
/// * `scraped_at` - Timestamp stamped on the record
///
/// # Returns
///
/// * `Ok(EnrichedRecord)` - At least one label was found; missing ones are `Unknown`
/// * `Err(FetchError::Parse)` - None of the labels appear on the page
pub fn parse_detail_page(
    identifier: &str,
    html: &str,
    scraped_at: DateTime<Utc>,
) -> Result<EnrichedRecord, FetchError> {
    let lines = page_lines(html);

    if !DETAIL_LABELS
        .iter()
        .any(|label| lines.iter().any(|line| line.contains(label)))
    {
        return Err(FetchError::Parse {
            identifier: identifier.to_string(),
            reason: "no project labels found on page".to_string(),
        });
    }

    let text = |label: &str| -> Field<String> { field_value(&lines, label).into() };
    let date = |label: &str| -> Field<String> { text(label).map(|raw| normalize_date(&raw)) };

    let location_address = text(LOCATION_ADDRESS);
    let city = location_address
        .clone()
        .and_then(|address| city_from_address(&address));

    Ok(EnrichedRecord {
        project_number: identifier.to_string(),
        project_id: Field::Unknown,
        project_name: text(PROJECT_NAME),
        facility_name: text(FACILITY_NAME),
        location_address,
        city,
        county: text(LOCATION_COUNTY),
        start_date: date(START_DATE),
        completion_date: date(COMPLETION_DATE),
        estimated_cost: text(ESTIMATED_COST).and_then(|raw| parse_cost(&raw)),
        type_of_work: text(TYPE_OF_WORK),
        type_of_funds: text(TYPE_OF_FUNDS),
        scope_of_work: text(SCOPE_OF_WORK),
        square_footage: text(SQUARE_FOOTAGE).and_then(|raw| parse_square_footage(&raw)),
        project_status: text(CURRENT_STATUS),
        owner_name: text(OWNER_NAME),
        owner_address: text(OWNER_ADDRESS),
        owner_phone: text(OWNER_PHONE),
        design_firm_name: text(DESIGN_FIRM_NAME),
        design_firm_address: text(DESIGN_FIRM_ADDRESS),
        ras_name: text(RAS_NAME),
        ras_number: text(RAS_NUMBER),
        registration_date: date(REGISTRATION_DATE),
        date_scraped: scraped_at,
    })
}

/// Flattens the document text into trimmed, non-empty lines
///
/// Text inside `script`, `style` and `noscript` elements is skipped.
pub fn page_lines(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut text = String::new();

    for node in document.tree.root().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };

        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name()))
            .is_some_and(|name| matches!(name, "script" | "style" | "noscript"));

        if !hidden {
            text.push_str(fragment);
        }
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Finds the value for a label
///
/// Lines are scanned in order; a line containing the label but no value
/// (and no following line) does not stop the scan.
pub fn field_value(lines: &[String], label: &str) -> Option<String> {
    for (i, line) in lines.iter().enumerate() {
        if !line.contains(label) {
            continue;
        }

        if line == label {
            if let Some(next) = lines.get(i + 1) {
                return Some(next.clone());
            }
            continue;
        }

        let value = line.replace(label, "");
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

/// Derives the city from a location address
///
/// Takes the second-to-last comma-separated segment and drops numeric words
/// and common street words: `"500 Main St, Austin, TX 78701"` gives `Austin`.
pub fn city_from_address(address: &str) -> Option<String> {
    let parts: Vec<&str> = address.split(',').collect();
    if parts.len() < 2 {
        return None;
    }

    let candidate = parts[parts.len() - 2].trim();
    let words: Vec<&str> = candidate
        .split_whitespace()
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !STREET_WORDS.contains(w))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Parses a cost such as `$1,250,000.00`
pub fn parse_cost(raw: &str) -> Option<f64> {
    static COST: OnceLock<Regex> = OnceLock::new();
    let re = COST.get_or_init(|| {
        Regex::new(r"\$?([\d,]+(?:\.\d+)?)").expect("cost regex is valid")
    });

    let digits = re.captures(raw)?.get(1)?.as_str().replace(',', "");
    digits.parse().ok()
}

/// Parses a square footage such as `3,500 ft 2`
pub fn parse_square_footage(raw: &str) -> Option<i64> {
    static AREA: OnceLock<Regex> = OnceLock::new();
    let re = AREA.get_or_init(|| Regex::new(r"[\d,]+").expect("area regex is valid"));

    let digits = re.find(raw)?.as_str().replace(',', "");
    digits.parse().ok()
}

/// Normalizes a date to `YYYY-MM-DD`, keeping the raw text when it does not parse
///
/// Accepted shapes: `MM/DD/YYYY` (optionally followed by a time),
/// `YYYY-MM-DD` and `Month D, YYYY`.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    let first_token = raw.split_whitespace().next().unwrap_or(raw);

    let parsed = NaiveDate::parse_from_str(first_token, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(first_token, "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%B %d, %Y"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%b %d, %Y"));

    match parsed {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => raw.to_string(),
    }
}
