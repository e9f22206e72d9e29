//! Timestamp encoding for stored conversations.
//!
//! New rows are always written as UTC `YYYY-MM-DD HH:MM:SS.ffffff`, which sorts
//! lexicographically in time order and matches the layout SQLite itself uses
//! for `CURRENT_TIMESTAMP`. Older stores may hold RFC 3339 text, so decoding
//! accepts both.

use chrono::{DateTime, NaiveDateTime, Utc};

const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const STORAGE_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Encode a timestamp in the canonical storage layout.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(STORAGE_FORMAT).to_string()
}

/// Decode a stored timestamp.
///
/// Tries the SQLite layout (with or without fractional seconds, read as UTC)
/// and then RFC 3339. Returns `None` when neither matches.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, STORAGE_PARSE_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
