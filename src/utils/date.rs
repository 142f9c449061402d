//! Date normalization for loosely-typed record fields
//!
//! Record fields arrive as JSON values: strings in a handful of shapes,
//! epoch-style numbers, or nothing at all. Everything is normalized to a
//! local, timezone-free [`CalendarInstant`]. Unparseable input yields `None`
//! and callers treat that as "date absent".

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde_json::Value;

/// A wall-clock instant in the viewer's local time.
pub type CalendarInstant = NaiveDateTime;

/// Canonical lexical form used for display, persistence and equality checks.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Lexical form used when time-of-day is tracked on a field.
pub const CANONICAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

// Formats tried after the strict forms, roughly in order of how often they
// show up in hand-written records.
const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// A date-like input in any of the shapes the normalizer accepts.
#[derive(Debug, Clone, Copy)]
pub enum DateInput<'a> {
    Text(&'a str),
    EpochMillis(i64),
    Instant(CalendarInstant),
}

/// Parse any accepted input shape.
pub fn parse_date(input: DateInput<'_>) -> Option<CalendarInstant> {
    match input {
        DateInput::Text(s) => parse_date_str(s),
        DateInput::EpochMillis(ms) => from_epoch_millis(ms),
        DateInput::Instant(instant) => Some(instant),
    }
}

/// Parse a raw JSON field value.
///
/// Strings go through [`parse_date_str`], numbers are read as epoch
/// milliseconds. Everything else (null, bools, arrays, objects) is absent.
pub fn parse_date_value(value: &Value) -> Option<CalendarInstant> {
    match value {
        Value::String(s) => parse_date(DateInput::Text(s)),
        Value::Number(n) => {
            let ms = n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                    .map(|f| f.trunc() as i64)
            })?;
            parse_date(DateInput::EpochMillis(ms))
        }
        _ => None,
    }
}

/// Parse a date string.
///
/// Order matters:
/// 1. strict `YYYY-MM-DD` is local midnight (never UTC, which would shift
///    the day for viewers west of Greenwich);
/// 2. `YYYY-MM-DD HH:MM[:SS]` with a space is local time;
/// 3. anything else goes through the generic fallback formats.
pub fn parse_date_str(raw: &str) -> Option<CalendarInstant> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if is_strict_date(s) {
        return NaiveDate::parse_from_str(s, CANONICAL_DATE_FORMAT)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN));
    }

    if let Some(instant) = parse_space_separated(s) {
        return Some(instant);
    }

    parse_generic(s)
}

/// Convert an epoch timestamp in milliseconds to local wall-clock time.
pub fn from_epoch_millis(ms: i64) -> Option<CalendarInstant> {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.naive_local())
}

/// Canonical `YYYY-MM-DD` form.
pub fn format_date(instant: &CalendarInstant) -> String {
    instant.format(CANONICAL_DATE_FORMAT).to_string()
}

/// Canonical form for write-back: time-of-day only when it is tracked.
pub fn format_with_optional_time(instant: &CalendarInstant, include_time: bool) -> String {
    if include_time {
        instant.format(CANONICAL_DATETIME_FORMAT).to_string()
    } else {
        format_date(instant)
    }
}

/// Whether a raw field value carries a time of day (`2026-03-15 09:30`,
/// `2026-03-15T09:30`). Bare dates and non-strings do not.
pub fn has_time_component(value: &Value) -> bool {
    match value {
        Value::String(s) => {
            let s = s.trim();
            s.get(..10).is_some_and(is_strict_date)
                && matches!(s.as_bytes().get(10), Some(b' ' | b'T'))
        }
        _ => false,
    }
}

fn is_strict_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

fn parse_space_separated(s: &str) -> Option<CalendarInstant> {
    let (date, time) = (s.get(..10)?, s.get(11..)?);
    if !is_strict_date(date) || s.as_bytes()[10] != b' ' {
        return None;
    }
    // Swap the space for the strict separator and read it as local time
    let strict = format!("{}T{}", date, time);
    NaiveDateTime::parse_from_str(&strict, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&strict, "%Y-%m-%dT%H:%M"))
        .ok()
}

fn parse_generic(s: &str) -> Option<CalendarInstant> {
    // Offset-carrying forms are converted into the viewer's local time
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}
