//! Shape-tolerant field lookup over raw scraper payloads.
//!
//! Actor output drifts between versions: the same logical field moves between
//! top-level keys and nested objects, ids arrive as strings or numbers, and
//! timestamps arrive as ISO strings or epoch integers. Lookups here take
//! candidate paths in priority order and return the first usable value, so
//! the normalization chains stay declarative.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Epoch values at or above this are read as milliseconds, below as seconds.
/// TikTok sends seconds; some Instagram payload variants send milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Resolves a `/`-separated path inside `value`. `None` for missing segments
/// and for explicit JSON nulls.
pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('/') {
        current = current.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// First path that yields a non-blank string. Numbers are stringified, so a
/// numeric id can fill a string field.
pub(crate) fn first_str(value: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| match lookup(value, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First path that yields an integer count. Accepts JSON integers and
/// numeric strings.
pub(crate) fn first_count(value: &Value, paths: &[&str]) -> Option<i64> {
    paths.iter().find_map(|path| match lookup(value, path)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// First path that yields a parseable instant. Strings are read as RFC 3339
/// and fall back to a stringified epoch; numbers are read as epoch
/// seconds or milliseconds by magnitude. Unparseable values are skipped, not
/// errors: a missing publish time degrades one field, never the whole item.
pub(crate) fn first_timestamp(value: &Value, paths: &[&str]) -> Option<DateTime<Utc>> {
    paths.iter().find_map(|path| match lookup(value, path)? {
        Value::String(s) => {
            let trimmed = s.trim();
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|t| t.with_timezone(&Utc))
                .or_else(|| trimmed.parse::<i64>().ok().and_then(epoch_to_datetime))
        }
        Value::Number(n) => n.as_i64().and_then(epoch_to_datetime),
        _ => None,
    })
}

fn epoch_to_datetime(raw: i64) -> Option<DateTime<Utc>> {
    if raw <= 0 {
        return None;
    }
    if raw >= EPOCH_MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(raw).single()
    } else {
        Utc.timestamp_opt(raw, 0).single()
    }
}
