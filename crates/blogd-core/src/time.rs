// ABOUTME: Timestamp helpers shared by every record type.
// ABOUTME: Produces RFC 3339 UTC strings and converts them back to unix seconds for `since` filters.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};

/// Current time as an RFC 3339 string with second precision and a `Z` suffix,
/// e.g. `2025-12-22T10:05:00Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored `created_at` into unix seconds. Blank or unparseable
/// values count as 0 so they sort before any real `since` cutoff.
pub fn unix_seconds(timestamp: &str) -> i64 {
    let trimmed = timestamp.trim();
    if trimmed.is_empty() {
        return 0;
    }
    if let Ok(seconds) = trimmed.parse::<i64>() {
        return seconds;
    }
    if let Ok(seconds) = trimmed.parse::<f64>()
        && seconds.is_finite()
    {
        return seconds as i64;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTimestamp {
    Text(String),
    Seconds(i64),
    FractionalSeconds(f64),
}

/// Accept `created_at` written as an RFC 3339 string, as unix seconds (int or
/// float), or as null. Numbers are kept as their unix-seconds text, which
/// [`unix_seconds`] reads back.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StoredTimestamp>::deserialize(deserializer)? {
        Some(StoredTimestamp::Text(text)) => text,
        Some(StoredTimestamp::Seconds(seconds)) => seconds.to_string(),
        Some(StoredTimestamp::FractionalSeconds(seconds)) => (seconds as i64).to_string(),
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_timestamp_is_utc_seconds() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'), "expected Z suffix: {}", ts);
        assert!(!ts.contains('.'), "expected second precision: {}", ts);
        assert!(unix_seconds(&ts) > 0);
    }

    #[test]
    fn unix_seconds_parses_rfc3339() {
        assert_eq!(unix_seconds("1970-01-01T00:01:00Z"), 60);
        assert_eq!(unix_seconds("1970-01-01T01:00:00+01:00"), 0);
    }

    #[test]
    fn unix_seconds_accepts_plain_integers() {
        assert_eq!(unix_seconds("1700000000"), 1_700_000_000);
    }

    #[test]
    fn unix_seconds_truncates_fractional_seconds() {
        assert_eq!(unix_seconds("1700000000.75"), 1_700_000_000);
    }

    #[derive(Debug, serde::Deserialize)]
    struct Stamped {
        #[serde(default, deserialize_with = "lenient_timestamp")]
        created_at: String,
    }

    fn stamped(json: &str) -> String {
        serde_json::from_str::<Stamped>(json).unwrap().created_at
    }

    #[test]
    fn lenient_timestamp_accepts_strings_numbers_and_null() {
        assert_eq!(stamped(r#"{"created_at": "2025-12-22T10:05:00Z"}"#), "2025-12-22T10:05:00Z");
        assert_eq!(stamped(r#"{"created_at": 1700000000}"#), "1700000000");
        assert_eq!(stamped(r#"{"created_at": 1700000000.9}"#), "1700000000");
        assert_eq!(stamped(r#"{"created_at": null}"#), "");
        assert_eq!(stamped("{}"), "");
    }

    #[test]
    fn unix_seconds_falls_back_to_zero() {
        assert_eq!(unix_seconds(""), 0);
        assert_eq!(unix_seconds("yesterday"), 0);
    }
}
