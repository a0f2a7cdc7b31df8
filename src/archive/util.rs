use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

pub const EPOCH_ISO: &str = "1970-01-01T00:00:00.000Z";

/// Parse the timestamp shapes found in archive exports.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) and a
/// bare `YYYY-MM-DD` (midnight UTC). Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

pub fn timestamp_or_epoch(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(parse_timestamp).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Non-empty string at `key`.
pub fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
