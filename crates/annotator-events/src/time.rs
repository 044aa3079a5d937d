//! Timestamp parsing for the two source timestamp families.
//!
//! Event viewer timestamps are UTC instants (`2019-03-26T10:42:55Z`, the
//! trailing designator is optional). Content-control timestamps always carry
//! an explicit offset (`2019-03-27T09:43:55+00:00`). Both are reduced to
//! epoch milliseconds for annotation purposes.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Utc};

use crate::error::ParseError;

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const COMPACT_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Parses a UTC event-viewer timestamp into the operator's local zone.
pub fn parse_utc_as_local(field: &'static str, raw: &str) -> Result<DateTime<Local>, ParseError> {
    parse_utc(field, raw).map(|utc| utc.with_timezone(&Local))
}

/// Parses a UTC timestamp, with or without an explicit designator.
pub fn parse_utc(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ParseError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, NAIVE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ParseError::Timestamp {
            field,
            value: raw.to_string(),
        })
}

/// Parses an offset-qualified timestamp.
///
/// Accepts RFC 3339 offsets (`+00:00`, `Z`) and the compact `+0000` form.
pub fn parse_offset(field: &'static str, raw: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let trimmed = raw.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .or_else(|_| DateTime::parse_from_str(trimmed, COMPACT_OFFSET_FORMAT))
        .map_err(|_| ParseError::Timestamp {
            field,
            value: raw.to_string(),
        })
}

/// Formats epoch milliseconds as a UTC wall-clock string for log output.
pub fn format_millis_utc(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("{millis} (out of range)"))
}
