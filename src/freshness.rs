//! Freshness policy for station observations.
//!
//! A station is fresh when its last observation is at most 30 days old.
//! The window is inclusive: exactly 30 days old is fresh, one second more is
//! not.
//!
//! # Clock injection
//!
//! Functions take `now` explicitly so tests stay deterministic.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Freshness window in days.
pub const FRESHNESS_WINDOW_DAYS: i64 = 30;

/// Returns `true` if `last_updated` lies within the freshness window of `now`.
///
/// Timestamps in the future count as fresh.
pub fn is_fresh_at(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - last_updated <= Duration::days(FRESHNESS_WINDOW_DAYS)
}

/// Freshness of a raw timestamp string. Unparseable input is stale.
pub fn is_fresh_str_at(last_updated: &str, now: DateTime<Utc>) -> bool {
    parse_timestamp(last_updated).is_some_and(|ts| is_fresh_at(ts, now))
}

/// Parse the timestamp formats seen across upstream feeds.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD`, `DD-MM-YYYY` and `DD/MM/YYYY`. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    parse_calendar_date(raw)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// Parse just the calendar date of a date or timestamp string.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_calendar_date(raw).or_else(|| parse_timestamp(raw).map(|ts| ts.date_naive()))
}

fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}
