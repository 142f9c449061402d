//! Record to task mapping
//!
//! The central transform: records plus a resolved role assignment become an
//! ordered list of timeline tasks. Row-level problems never fail the whole
//! mapping; a record without a usable start is skipped, bad ends are
//! defaulted and unknown dependency names are dropped.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use serde_json::Value;

use crate::models::{task_id_for_key, DisplayConfig, Record, Role, RoleAssignment, TimelineTask};
use crate::timeline::links::NameIndex;
use crate::timeline::sort::sort_by_dependencies;
use crate::utils::{format_date, parse_date_value, CalendarInstant};

/// Number of distinct color classes; further values wrap around
pub const COLOR_BUCKETS: usize = 8;

/// Color bucket assignment by first-seen value
#[derive(Debug, Default, Clone)]
pub struct ColorBuckets {
    seen: Vec<String>,
}

impl ColorBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket_for(&mut self, value: &str) -> usize {
        let index = match self.seen.iter().position(|v| v == value) {
            Some(index) => index,
            None => {
                self.seen.push(value.to_string());
                self.seen.len() - 1
            }
        };
        index % COLOR_BUCKETS
    }

    /// Observed values with their bucket, in first-seen order
    pub fn legend(&self) -> impl Iterator<Item = (&str, usize)> {
        self.seen
            .iter()
            .enumerate()
            .map(|(i, v)| (v.as_str(), i % COLOR_BUCKETS))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MapOptions {
    pub show_progress: bool,
    pub show_expected_progress: bool,
    /// Render date used for expected progress
    pub today: NaiveDate,
}

impl MapOptions {
    pub fn from_display(display: &DisplayConfig, today: NaiveDate) -> Self {
        Self {
            show_progress: display.show_progress,
            show_expected_progress: display.show_expected_progress,
            today,
        }
    }
}

/// Map records to dependency-sorted tasks.
///
/// `index` covers the whole record set, not just `records`, so a mapped
/// subset (one group) still resolves links to records outside it.
/// Returns an empty list when no start role is assigned; callers report
/// that as needing configuration.
pub fn map_records(
    records: &[Record],
    roles: &RoleAssignment,
    options: &MapOptions,
    colors: &mut ColorBuckets,
    index: &NameIndex,
) -> Vec<TimelineTask> {
    let Some(start_field) = roles.get(Role::Start) else {
        log::debug!("No start role assigned; nothing to map");
        return Vec::new();
    };

    let mut seen_keys = HashSet::new();
    let mut tasks = Vec::with_capacity(records.len());

    for record in records {
        if !seen_keys.insert(record.key.as_str()) {
            log::warn!("Duplicate record key {}; keeping the first", record.key);
            continue;
        }
        if let Some(task) = map_record(record, start_field, roles, options, colors, index) {
            tasks.push(task);
        }
    }

    log::debug!("Mapped {} of {} records", tasks.len(), records.len());
    sort_by_dependencies(tasks)
}

fn map_record(
    record: &Record,
    start_field: &str,
    roles: &RoleAssignment,
    options: &MapOptions,
    colors: &mut ColorBuckets,
    index: &NameIndex,
) -> Option<TimelineTask> {
    let Some(start) = record.field(start_field).and_then(parse_date_value) else {
        log::debug!("Skipping {}: no usable '{}' value", record.key, start_field);
        return None;
    };

    let raw_end: Option<CalendarInstant> = roles
        .get(Role::End)
        .and_then(|field| record.field(field))
        .and_then(parse_date_value);

    // Compared before any defaulting
    let is_milestone = raw_end.is_some_and(|end| format_date(&end) == format_date(&start));

    let start_date = start.date();
    let end_date = match raw_end {
        Some(end) if end < start => {
            log::debug!("{}: end before start, using default duration", record.key);
            None
        }
        Some(_) if is_milestone => None,
        Some(end) => Some(end.date()),
        None => None,
    }
    .unwrap_or_else(|| day_after(start_date));

    let id = task_id_for_key(&record.key);
    let dependencies = roles
        .get(Role::Dependencies)
        .and_then(|field| record.field(field))
        .map(|raw| index.resolve_dependencies(raw, &id))
        .unwrap_or_default();

    let progress = if options.show_progress {
        roles
            .get(Role::Progress)
            .and_then(|field| record.field(field))
            .and_then(parse_progress)
            .unwrap_or(0)
    } else {
        0
    };

    let expected_progress = options
        .show_expected_progress
        .then(|| expected_progress(start_date, end_date, options.today));

    let color_bucket = roles
        .get(Role::ColorBy)
        .and_then(|field| record.field(field))
        .and_then(category_value)
        .map(|value| colors.bucket_for(&value));

    Some(TimelineTask {
        id,
        name: label(record, roles),
        start: start_date,
        end: end_date,
        progress,
        expected_progress,
        dependencies,
        color_bucket,
        is_milestone,
        source: Some(record.key.clone()),
    })
}

fn day_after(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

fn label(record: &Record, roles: &RoleAssignment) -> String {
    roles
        .get(Role::Label)
        .and_then(|field| record.field(field))
        .and_then(category_value)
        .unwrap_or_else(|| record.display_name())
}

/// Progress as a whole percentage. Accepts numbers and numeric strings
/// (`"75"`, `"75%"`); anything else is ignored.
pub fn parse_progress(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            s.strip_suffix('%').unwrap_or(s).trim().parse::<f64>().ok()?
        }
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.round().clamp(0.0, 100.0) as u8)
}

/// Share of the span elapsed on `today`
pub fn expected_progress(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> u8 {
    let span = (end - start).num_days().max(1);
    let elapsed = (today - start).num_days().clamp(0, span);
    ((elapsed * 100) as f64 / span as f64).round() as u8
}

/// Textual form of a categorical value; blank and structured values have none
pub fn category_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(category_value)
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
