//! Search result rendering
//!
//! Formats stored projects for the `search` command.

use crate::record::{EnrichedRecord, Field};
use std::fmt::Write;

/// Renders search results as a human-readable listing
pub fn format_search_results(query: &str, results: &[EnrichedRecord]) -> String {
    let mut out = String::new();

    if results.is_empty() {
        let _ = writeln!(out, "No projects match \"{}\"", query);
        return out;
    }

    let _ = writeln!(out, "Found {} matching projects:\n", results.len());
    for record in results {
        let _ = writeln!(out, "{}", record.project_number);
        let _ = writeln!(out, "   Name: {}", record.project_name);
        let _ = writeln!(out, "   Facility: {}", record.facility_name);
        let _ = writeln!(out, "   Location: {}, {}", record.city, record.county);
        let _ = writeln!(
            out,
            "   Square Footage: {}",
            match record.square_footage {
                Field::Known(sqft) => format!("{} sqft", group_thousands(sqft.to_string())),
                Field::Unknown => "N/A".to_string(),
            }
        );
        let _ = writeln!(out, "   Cost: {}", format_cost(&record.estimated_cost));
        let _ = writeln!(out, "   Status: {}", record.project_status);
        let _ = writeln!(out, "   Registered: {}", record.registration_date);
        let _ = writeln!(out, "   Start: {}\n", record.start_date);
    }

    out
}

/// Formats a cost as `$1,234,567.89`
pub fn format_cost(cost: &Field<f64>) -> String {
    match cost {
        Field::Known(value) => {
            let fixed = format!("{:.2}", value);
            let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
            format!("${}.{}", group_thousands(whole.to_string()), cents)
        }
        Field::Unknown => "N/A".to_string(),
    }
}

/// Inserts comma separators into an integer string
fn group_thousands(digits: String) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest.to_string()),
        None => ("", digits),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}", sign, grouped)
}
