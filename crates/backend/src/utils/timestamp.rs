//! Timestamp parsing and normalization.
//!
//! The calendar provider accepts and returns Unix seconds, while the HTTP
//! API and parts of the provider payloads speak ISO-8601. Everything is
//! normalized to Unix seconds at the boundary.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use shared_types::TimeValue;

/// Parse an ISO-8601 timestamp string to Unix seconds.
///
/// Strings without an offset (e.g. "2025-10-25T00:00:00") are interpreted
/// in the server's local timezone.
pub fn parse_iso_timestamp(iso: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return Ok(dt.timestamp());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d"] {
        let parsed = if format == "%Y-%m-%d" {
            chrono::NaiveDate::parse_from_str(iso, format)
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        } else {
            NaiveDateTime::parse_from_str(iso, format)
        };
        if let Ok(naive) = parsed {
            if let Some(dt) = Local.from_local_datetime(&naive).earliest() {
                return Ok(dt.timestamp());
            }
        }
    }

    Err(anyhow!("Invalid ISO 8601 timestamp format: {iso}"))
}

/// Normalize a mixed-representation time value to Unix seconds.
///
/// Numeric values are truncated to whole seconds; textual values may be a
/// digit string or an ISO-8601 timestamp; absent (or empty-string) values
/// yield `None`.
pub fn ensure_unix_timestamp(value: &TimeValue) -> Result<Option<i64>> {
    match value {
        TimeValue::Absent => Ok(None),
        TimeValue::Numeric(secs) => Ok(Some(*secs as i64)),
        TimeValue::Textual(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.chars().all(|c| c.is_ascii_digit()) {
                return trimmed
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|e| anyhow!("Timestamp out of range: {e}"));
            }
            match parse_iso_timestamp(trimmed) {
                Ok(secs) => Ok(Some(secs)),
                Err(e) => bail!("Unsupported timestamp value {trimmed:?}: {e}"),
            }
        }
    }
}

/// Render Unix seconds as a local-time ISO-8601 string without offset,
/// seconds precision when the value has no fractional part.
pub fn format_local_iso(seconds: f64) -> String {
    let secs = seconds.trunc() as i64;
    let nanos = ((seconds - seconds.trunc()) * 1e9).round() as u32;
    match Local.timestamp_opt(secs, nanos) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            if nanos == 0 {
                dt.naive_local().format("%Y-%m-%dT%H:%M:%S").to_string()
            } else {
                dt.naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
            }
        }
        chrono::LocalResult::None => seconds.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_with_offset() {
        let secs = parse_iso_timestamp("2025-10-25T00:00:00+00:00").unwrap();
        assert_eq!(secs, 1761350400);
    }

    #[test]
    fn test_parse_iso_rejects_garbage() {
        assert!(parse_iso_timestamp("not a timestamp").is_err());
        assert!(parse_iso_timestamp("").is_err());
    }

    #[test]
    fn test_parse_iso_naive_roundtrips_through_local() {
        // Offset-less input is local time, so render and reparse agree.
        let secs = parse_iso_timestamp("2025-10-25T08:30:00").unwrap();
        assert_eq!(format_local_iso(secs as f64), "2025-10-25T08:30:00");
    }

    #[test]
    fn test_ensure_unix_numeric() {
        assert_eq!(
            ensure_unix_timestamp(&TimeValue::Numeric(1674604800.7)).unwrap(),
            Some(1674604800)
        );
    }

    #[test]
    fn test_ensure_unix_digit_string() {
        assert_eq!(
            ensure_unix_timestamp(&TimeValue::Textual("1674604800".into())).unwrap(),
            Some(1674604800)
        );
    }

    #[test]
    fn test_ensure_unix_iso_string() {
        assert_eq!(
            ensure_unix_timestamp(&TimeValue::Textual(
                "2025-10-25T00:00:00+00:00".into()
            ))
            .unwrap(),
            Some(1761350400)
        );
    }

    #[test]
    fn test_ensure_unix_absent_and_empty() {
        assert_eq!(ensure_unix_timestamp(&TimeValue::Absent).unwrap(), None);
        assert_eq!(
            ensure_unix_timestamp(&TimeValue::Textual("   ".into())).unwrap(),
            None
        );
    }

    #[test]
    fn test_ensure_unix_rejects_garbage() {
        assert!(ensure_unix_timestamp(&TimeValue::Textual("soon".into())).is_err());
    }
}
