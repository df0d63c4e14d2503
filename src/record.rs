//! Record types flowing through the harvest pipeline
//!
//! - `SummaryRecord`: one entry of the paginated listing
//! - `EnrichedRecord`: the full project after its detail page was parsed
//! - `Field<T>`: a typed value that is either known or explicitly unknown

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde_json::Map;
use std::fmt;

/// A typed field extracted from a detail page
///
/// Absent labels map to `Unknown`. The source does not distinguish "unknown"
/// from "not yet assigned", so neither does this type. `Unknown` is stored as
/// SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Known(T),
    Unknown,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Unknown
    }
}

impl<T> Field<T> {
    /// Returns the value if known
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Maps a known value, keeping `Unknown` as is
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Field<U> {
        match self {
            Self::Known(value) => Field::Known(f(value)),
            Self::Unknown => Field::Unknown,
        }
    }

    /// Chains a fallible conversion; a failed conversion becomes `Unknown`
    pub fn and_then<U, F: FnOnce(T) -> Option<U>>(self, f: F) -> Field<U> {
        match self {
            Self::Known(value) => f(value).into(),
            Self::Unknown => Field::Unknown,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Known(v),
            None => Self::Unknown,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(value) => write!(f, "{}", value),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

impl<T: ToSql> ToSql for Field<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Known(value) => value.to_sql(),
            Self::Unknown => Ok(ToSqlOutput::Owned(Value::Null)),
        }
    }
}

impl<T: FromSql> FromSql for Field<T> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::Unknown),
            other => T::column_result(other).map(Self::Known),
        }
    }
}

/// One project as returned by the listing endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    /// Public project number (e.g. `TABS2026012633`); the deduplication key
    pub project_number: String,

    /// Remote surrogate id, when the listing provides one
    pub project_id: Option<String>,

    /// Project name as listed
    pub project_name: Option<String>,

    /// The raw listing entry as received
    pub attributes: Map<String, serde_json::Value>,
}

impl SummaryRecord {
    /// The stable identifier used to key stored records
    pub fn identifier(&self) -> &str {
        &self.project_number
    }

    /// Builds a summary from one element of the listing `data` array
    ///
    /// Returns None if the entry is not an object or has no project number.
    pub fn from_listing_entry(entry: &serde_json::Value) -> Option<Self> {
        let attributes = entry.as_object()?.clone();

        let project_number = attributes
            .get("ProjectNumber")
            .and_then(json_scalar_to_string)
            .filter(|s| !s.is_empty())?;

        let project_id = attributes.get("ProjectId").and_then(json_scalar_to_string);
        let project_name = attributes
            .get("ProjectName")
            .and_then(json_scalar_to_string);

        Some(Self {
            project_number,
            project_id,
            project_name,
            attributes,
        })
    }
}

/// Renders a JSON string or number as trimmed text
fn json_scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A fully detailed project, built once per successful detail fetch
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub project_number: String,
    pub project_id: Field<String>,
    pub project_name: Field<String>,
    pub facility_name: Field<String>,
    pub location_address: Field<String>,
    pub city: Field<String>,
    pub county: Field<String>,
    pub start_date: Field<String>,
    pub completion_date: Field<String>,
    pub estimated_cost: Field<f64>,
    pub type_of_work: Field<String>,
    pub type_of_funds: Field<String>,
    pub scope_of_work: Field<String>,
    pub square_footage: Field<i64>,
    pub project_status: Field<String>,
    pub owner_name: Field<String>,
    pub owner_address: Field<String>,
    pub owner_phone: Field<String>,
    pub design_firm_name: Field<String>,
    pub design_firm_address: Field<String>,
    pub ras_name: Field<String>,
    pub ras_number: Field<String>,
    pub registration_date: Field<String>,
    pub date_scraped: DateTime<Utc>,
}

impl EnrichedRecord {
    /// Creates a record with every field unknown
    pub fn unknown(project_number: impl Into<String>, date_scraped: DateTime<Utc>) -> Self {
        Self {
            project_number: project_number.into(),
            project_id: Field::Unknown,
            project_name: Field::Unknown,
            facility_name: Field::Unknown,
            location_address: Field::Unknown,
            city: Field::Unknown,
            county: Field::Unknown,
            start_date: Field::Unknown,
            completion_date: Field::Unknown,
            estimated_cost: Field::Unknown,
            type_of_work: Field::Unknown,
            type_of_funds: Field::Unknown,
            scope_of_work: Field::Unknown,
            square_footage: Field::Unknown,
            project_status: Field::Unknown,
            owner_name: Field::Unknown,
            owner_address: Field::Unknown,
            owner_phone: Field::Unknown,
            design_firm_name: Field::Unknown,
            design_firm_address: Field::Unknown,
            ras_name: Field::Unknown,
            ras_number: Field::Unknown,
            registration_date: Field::Unknown,
            date_scraped,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.project_number
    }
}

/// Formats a scrape timestamp for storage
///
/// Fixed precision and a `Z` suffix keep stored timestamps lexicographically
/// ordered, which the store relies on for last-write-wins.
pub fn timestamp_to_db(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
