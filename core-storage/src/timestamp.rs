//! Timestamp normalisation
//!
//! Storage backends report instants with or without fractional seconds and
//! with `Z` or a numeric offset. Everything is converted to UTC on the way in
//! and rendered in one fixed format on the way out.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Output format for index timestamps, e.g. `2021-03-23T10:20:30.000000Z`
pub const INDEX_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Parse a storage timestamp into UTC.
///
/// Accepts RFC 3339 (`2021-03-23T10:20:30Z`, `2021-03-23T06:20:30.5-04:00`)
/// and, as a fallback, offset-less instants which are taken to be UTC.
pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render an instant in the index's timestamp format
pub fn to_index_string(dt: &DateTime<Utc>) -> String {
    dt.format(INDEX_DATE_FORMAT).to_string()
}

/// Normalise a partial calendar date to a midnight UTC index instant.
///
/// `YYYY-MM-DD`, `YYYY-MM` and `YYYY` are accepted; anything else (including
/// impossible dates such as `2021-02-30`) yields `None`.
pub fn normalize_partial_date(value: &str) -> Option<String> {
    let value = value.trim();
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    let parts: Vec<&str> = value.split('-').collect();
    let full = match parts.as_slice() {
        [y, m, d] if y.len() == 4 && m.len() == 2 && d.len() == 2 => value.to_string(),
        [y, m] if y.len() == 4 && m.len() == 2 => format!("{}-01", value),
        [y] if y.len() == 4 => format!("{}-01-01", value),
        _ => return None,
    };

    if !parts.iter().all(|part| is_digits(part)) {
        return None;
    }

    NaiveDate::parse_from_str(&full, "%Y-%m-%d")
        .ok()
        .map(|_| format!("{}T00:00:00Z", full))
}
