//! Edit-back translation
//!
//! Turns timeline events (date range changes, progress changes, date-cell
//! clicks) into field updates against exactly one record. Only mapped fields
//! whose value actually changes are written.

use anyhow::Result;
use chrono::{Days, NaiveDate, NaiveTime};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{key_from_task_id, Record, Role, RoleAssignment};
use crate::repo::{RecordStore, WriteOutcome};
use crate::utils::{
    format_date, format_with_optional_time, has_time_component, parse_date_value,
    CalendarInstant, CANONICAL_DATE_FORMAT,
};

/// A single field assignment
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub field: String,
    pub value: Value,
}

impl FieldWrite {
    pub fn new(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

/// Field writes targeting one record
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub record_key: String,
    pub writes: Vec<FieldWrite>,
}

impl FieldUpdate {
    pub fn new(record_key: impl Into<String>) -> Self {
        Self {
            record_key: record_key.into(),
            writes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.writes.iter().map(|w| w.field.as_str())
    }
}

/// Callback surface of the rendering collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    Click { task_id: String },
    DateChange { task_id: String, start: NaiveDate, end: NaiveDate },
    ProgressChange { task_id: String, progress: i64 },
    /// Click on an empty date cell: create `key` starting there
    DateClick { date: NaiveDate, key: String, name: Option<String> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("'{0}' is not a record task")]
    NotARecordTask(String),
    #[error("No field is mapped to the {0} role")]
    RoleNotMapped(&'static str),
    #[error("End date {end} is before start date {start}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

/// Record key behind a task id. Group headers have none.
pub fn record_key_for(task_id: &str) -> Result<&str, EditError> {
    key_from_task_id(task_id).ok_or_else(|| EditError::NotARecordTask(task_id.to_string()))
}

/// Translate a dragged or resized bar into start/end field writes.
///
/// `start`/`end` are the bar as displayed. Milestones are displayed one day
/// wide, so a one-day range on a record whose start and end coincide is
/// written back as end = start.
pub fn translate_date_change(
    record: &Record,
    roles: &RoleAssignment,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<FieldUpdate, EditError> {
    if end < start {
        return Err(EditError::InvertedRange { start, end });
    }
    let start_field = mapped(roles, Role::Start)?;
    let mut update = FieldUpdate::new(&record.key);

    let (start_at, start_timed) = place_date(record, start_field, start);
    push_if_changed(&mut update, record, start_field, date_value(&start_at, start_timed));

    if let Some(end_field) = roles.get(Role::End) {
        let one_day = start.checked_add_days(Days::new(1)) == Some(end);
        let stored_end = if end == start || (one_day && is_milestone(record, roles)) {
            start
        } else {
            end
        };
        let (mut end_at, mut end_timed) = place_date(record, end_field, stored_end);
        // A same-day end whose time of day precedes the start's reads back as inverted
        if end_at < start_at {
            end_at = start_at;
            end_timed = start_timed;
        }
        push_if_changed(&mut update, record, end_field, date_value(&end_at, end_timed));
    }

    Ok(update)
}

/// Translate a progress drag into a progress field write
pub fn translate_progress_change(
    record: &Record,
    roles: &RoleAssignment,
    progress: i64,
) -> Result<FieldUpdate, EditError> {
    let field = mapped(roles, Role::Progress)?;
    let mut update = FieldUpdate::new(&record.key);
    push_if_changed(&mut update, record, field, Value::from(progress.clamp(0, 100)));
    Ok(update)
}

/// Fields for a record created by clicking an empty date cell
pub fn seed_fields(roles: &RoleAssignment, date: NaiveDate) -> Result<Map<String, Value>, EditError> {
    let start_field = mapped(roles, Role::Start)?;
    let formatted = Value::String(date.format(CANONICAL_DATE_FORMAT).to_string());

    let mut fields = Map::new();
    fields.insert(start_field.to_string(), formatted.clone());
    if let Some(end_field) = roles.get(Role::End) {
        fields.insert(end_field.to_string(), formatted);
    }
    Ok(fields)
}

/// Persist one update. A vanished record is a logged no-op.
pub fn apply_update<S: RecordStore + ?Sized>(store: &S, update: &FieldUpdate) -> Result<WriteOutcome> {
    if update.is_empty() {
        log::debug!("No field changes for {}", update.record_key);
        return Ok(WriteOutcome::Unchanged);
    }

    let outcome = store.write_fields(update)?;
    match outcome {
        WriteOutcome::Written(n) => log::info!(
            "Wrote {} field(s) to {}: {}",
            n,
            update.record_key,
            update.fields().collect::<Vec<_>>().join(", ")
        ),
        WriteOutcome::Unchanged => log::debug!("No field changes for {}", update.record_key),
        WriteOutcome::RecordMissing => {
            log::warn!("Record {} no longer exists; edit dropped", update.record_key)
        }
    }
    Ok(outcome)
}

fn mapped(roles: &RoleAssignment, role: Role) -> Result<&str, EditError> {
    roles.get(role).ok_or(EditError::RoleNotMapped(role.as_str()))
}

fn push_if_changed(update: &mut FieldUpdate, record: &Record, field: &str, value: Value) {
    if record.fields.get(field) != Some(&value) {
        update.writes.push(FieldWrite::new(field, value));
    }
}

// Keeps the stored time of day when the current value tracks one
fn place_date(record: &Record, field: &str, date: NaiveDate) -> (CalendarInstant, bool) {
    let time = record
        .field(field)
        .filter(|raw| has_time_component(raw))
        .and_then(parse_date_value)
        .map(|instant| instant.time());

    match time {
        Some(time) => (date.and_time(time), true),
        None => (date.and_time(NaiveTime::MIN), false),
    }
}

fn date_value(instant: &CalendarInstant, with_time: bool) -> Value {
    Value::String(format_with_optional_time(instant, with_time))
}

fn is_milestone(record: &Record, roles: &RoleAssignment) -> bool {
    let parsed = |role: Role| {
        roles
            .get(role)
            .and_then(|field| record.field(field))
            .and_then(parse_date_value)
            .map(|instant| format_date(&instant))
    };
    match (parsed(Role::Start), parsed(Role::End)) {
        (Some(start), Some(end)) => start == end,
        _ => false,
    }
}
