//! Permissive temporal parsing for heterogeneous schedule data.
//!
//! Imported rows carry dates in whatever shape the uploader's tooling
//! produced. `parse_datetime` tries a fixed format ladder and returns `None`
//! on miss; normalization records a warning and leaves the field null, it
//! never errors on an unparseable date. Naive values are taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Datetime formats tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M",
];

/// Date-only formats; a match is anchored at midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:(\d+)\s*h)?\s*(?:(\d+)\s*m(?:in)?)?\s*$").unwrap());

/// Parse a loosely formatted datetime string.
///
/// Tries RFC 3339, then common `YYYY-MM-DD`/`DD/MM/YYYY` datetime shapes,
/// then bare dates (anchored at midnight). Time-only values (`HH:MM`) are
/// not anchored to a date and return `None`.
pub fn parse_datetime(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }

    None
}

/// Parse a duration string like `2h`, `45m`, `1h30m` into minutes.
///
/// Returns `None` for anything else, including a bare number; callers
/// decide whether a unit-less value means minutes.
pub fn parse_duration_minutes(input: &str) -> Option<i32> {
    let caps = DURATION_RE.captures(input)?;
    let hours: i32 = caps.get(1).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    let minutes: i32 = caps.get(2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    if caps.get(1).is_none() && caps.get(2).is_none() {
        return None;
    }
    Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_rfc3339() {
        let dt = parse_datetime("2024-03-15T09:30:00+07:00").unwrap();
        assert_eq!(dt.hour(), 2); // 09:30 UTC+7 = 02:30 UTC
    }

    #[test]
    fn parses_space_separated_datetime() {
        let dt = parse_datetime("2024-01-01 09:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T09:00:00+00:00");
    }

    #[test]
    fn parses_seconds_variant() {
        assert!(parse_datetime("2024-01-01 09:00:30").is_some());
        assert!(parse_datetime("2024-01-01T09:00:30").is_some());
    }

    #[test]
    fn parses_day_first_formats() {
        let dt = parse_datetime("15/03/2024 14:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-15T14:00:00+00:00");
        assert!(parse_datetime("15.03.2024 14:00").is_some());
    }

    #[test]
    fn bare_date_anchors_at_midnight() {
        let dt = parse_datetime("2024-06-01").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        assert!(parse_datetime("01/06/2024").is_some());
    }

    #[test]
    fn rejects_time_only_and_garbage() {
        assert!(parse_datetime("14:30").is_none());
        assert!(parse_datetime("next tuesday").is_none());
        assert!(parse_datetime("").is_none());
        assert!(parse_datetime("   ").is_none());
    }

    #[test]
    fn duration_hours_and_minutes() {
        assert_eq!(parse_duration_minutes("2h"), Some(120));
        assert_eq!(parse_duration_minutes("45m"), Some(45));
        assert_eq!(parse_duration_minutes("1h30m"), Some(90));
        assert_eq!(parse_duration_minutes("1H 15M"), Some(75));
        assert_eq!(parse_duration_minutes("30min"), Some(30));
    }

    #[test]
    fn duration_rejects_unitless_and_garbage() {
        assert_eq!(parse_duration_minutes("90"), None);
        assert_eq!(parse_duration_minutes("an hour"), None);
        assert_eq!(parse_duration_minutes(""), None);
    }
}
