//! Timestamp encoding.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC with
//! microsecond precision (`2026-01-01T00:00:00.000000Z`). Fixed width keeps
//! lexicographic order equal to chronological order, so the store can compare
//! and sort the text column directly.

use chrono::{DateTime, SecondsFormat, Utc};

/// Encode a timestamp in the storage format.
pub fn encode(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp.
pub fn decode(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

/// Current time in the storage format.
pub fn now_encoded() -> String {
    encode(Utc::now())
}
