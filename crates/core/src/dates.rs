//! Lenient date/time parsing shared by normalization, ordered comparisons
//! and revert equivalence.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Canonical output format for date-typed properties.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%d-%b-%Y"];

/// Parse a date or date-time string in any of the accepted layouts.
///
/// Offsets in RFC 3339 input are dropped and the wall-clock time is kept, so
/// the calendar date never shifts. Date-only input yields midnight.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Re-emit a parseable date as `yyyy-MM-dd`; `None` when unparsable.
pub fn to_iso_date(s: &str) -> Option<String> {
    parse_datetime(s).map(|dt| dt.date().format(ISO_DATE_FORMAT).to_string())
}

/// Whether a parsed value carries a time of day other than midnight.
pub fn has_time_of_day(dt: &NaiveDateTime) -> bool {
    dt.time() != NaiveTime::MIN
}
