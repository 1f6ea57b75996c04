//! Date parsing helpers for page dates.
//!
//! Every page date is normalized to UTC. Front matter strings accept
//! RFC 3339 timestamps as well as the looser ISO-8601 shapes people actually
//! write (`2021-03-04`, `2021-03-04T10:00`, `2021-03-04 10:00:00`).

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use std::{sync::LazyLock, time::SystemTime};

/// `YYYY-MM-DD` anywhere in a path, e.g. `posts/2021-03-04-hello.md`.
static PATH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{4}-[0-9]{2}-[0-9]{2})").unwrap());

/// Naive layouts tried after RFC 3339, all interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 date or datetime string in UTC.
///
/// Returns `None` when the string is not a recognizable date.
pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Find the first valid `YYYY-MM-DD` in a path string.
pub fn date_from_path(path: &str) -> Option<DateTime<Utc>> {
    PATH_DATE
        .find_iter(path)
        .find_map(|m| parse_iso(m.as_str()))
}

/// Convert milliseconds since the unix epoch.
pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Convert seconds since the unix epoch (commit times).
pub fn from_unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[inline]
pub fn from_system_time(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Format as `2021-03-04T00:00:00Z`, the shape stored in `page.date`.
#[inline]
pub fn to_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
