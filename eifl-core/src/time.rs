//! Timestamp formatting for the store
//!
//! All timestamps are persisted as UTC ISO-8601 strings with millisecond
//! precision. Parsing is lenient: rows written by hand or by older builds
//! fall back to the epoch rather than failing the whole query.

use chrono::{DateTime, Utc};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format a timestamp the way the store persists it
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

/// Current time in store format
pub fn now_ts() -> String {
    format_ts(Utc::now())
}

/// Parse a stored timestamp
pub fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a stored timestamp, defaulting to the epoch on malformed input
pub fn parse_ts_lossy(s: &str) -> DateTime<Utc> {
    parse_ts(s).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional stored timestamp
pub fn parse_ts_opt(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.and_then(parse_ts)
}
