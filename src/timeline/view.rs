//! Timeline view
//!
//! One `TimelineView` per rendered timeline. It owns the configuration, the
//! detection cache and the task list of the last refresh; commands act on a
//! view they hold explicitly.

use anyhow::{bail, Result};
use chrono::NaiveDate;

use crate::models::{task_id_for_key, Record, Role, RoleAssignment, TimelineConfig, TimelineTask};
use crate::repo::{RecordStore, WriteOutcome};
use crate::timeline::detect::{ResolvedRoles, RoleCache};
use crate::timeline::edit::{
    apply_update, record_key_for, seed_fields, translate_date_change, translate_progress_change,
    TimelineEvent,
};
use crate::timeline::groups::{flatten_groups, group_records, TaskGroup};
use crate::timeline::links::NameIndex;
use crate::timeline::mapper::{category_value, map_records, ColorBuckets, MapOptions};

/// Result of a refresh
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineOutcome {
    /// No start field is pinned or detectable
    NeedsConfiguration,
    Ready(Vec<TimelineTask>),
}

/// Result of handling one timeline event
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Click: the originating record
    Opened(Record),
    /// Date or progress change written back
    Written { key: String, outcome: WriteOutcome },
    /// Date-cell click: the new record
    Created(Record),
    /// Target record vanished since the last refresh
    Missing(String),
}

#[derive(Debug, Default)]
pub struct TimelineView {
    config: TimelineConfig,
    cache: RoleCache,
    roles: Option<RoleAssignment>,
    tasks: Vec<TimelineTask>,
}

impl TimelineView {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Replace the configuration; detection and tasks start over
    pub fn set_config(&mut self, config: TimelineConfig) {
        self.config = config;
        self.cache.invalidate();
        self.roles = None;
        self.tasks.clear();
    }

    /// Tasks of the last refresh
    pub fn tasks(&self) -> &[TimelineTask] {
        &self.tasks
    }

    /// Effective roles for a record set (pinned plus detected)
    pub fn resolve_roles(&mut self, records: &[Record]) -> &ResolvedRoles {
        self.cache.resolve(records, &self.config.roles)
    }

    /// Reload records from the store and rebuild the task list
    pub fn refresh<S: RecordStore + ?Sized>(&mut self, store: &S, today: NaiveDate) -> Result<TimelineOutcome> {
        let records = store.list()?;
        Ok(self.refresh_from(&records, today))
    }

    /// Rebuild the task list from a record snapshot
    pub fn refresh_from(&mut self, records: &[Record], today: NaiveDate) -> TimelineOutcome {
        let roles = self.resolve_roles(records).assignment.clone();
        self.tasks.clear();
        self.roles = Some(roles.clone());

        if !roles.is_set(Role::Start) {
            log::info!("No start field configured or detected");
            return TimelineOutcome::NeedsConfiguration;
        }

        // Buckets follow the natural order of the whole set, not group order
        let mut colors = ColorBuckets::new();
        if let Some(field) = roles.get(Role::ColorBy) {
            for value in records.iter().filter_map(|r| r.field(field).and_then(category_value)) {
                colors.bucket_for(&value);
            }
        }

        // Links resolve against every record, whichever group holds them
        let index = NameIndex::build(records);
        let options = MapOptions::from_display(&self.config.display, today);
        let groups = group_records(records.to_vec(), self.config.group_by.as_deref())
            .into_iter()
            .map(|group| TaskGroup {
                tasks: map_records(&group.records, &roles, &options, &mut colors, &index),
                name: group.name,
            })
            .collect();

        self.tasks = flatten_groups(groups);
        log::debug!("Timeline refreshed with {} rows", self.tasks.len());
        TimelineOutcome::Ready(self.tasks.clone())
    }

    /// Find a task by id or by the bare record key
    pub fn find_task(&self, reference: &str) -> Option<&TimelineTask> {
        let as_id = task_id_for_key(reference);
        self.tasks
            .iter()
            .find(|t| t.id == reference)
            .or_else(|| self.tasks.iter().find(|t| t.id == as_id))
    }

    /// Handle one event from the rendering collaborator.
    ///
    /// Writes are applied one event at a time against a freshly read record,
    /// so several events for different records never overwrite each other.
    pub fn handle_event<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        event: TimelineEvent,
    ) -> Result<EventOutcome> {
        let Some(roles) = self.roles.clone() else {
            bail!("Timeline has not been refreshed yet");
        };

        match event {
            TimelineEvent::Click { task_id } => {
                let key = record_key_for(&task_id)?;
                Ok(match store.get(key)? {
                    Some(record) => EventOutcome::Opened(record),
                    None => EventOutcome::Missing(key.to_string()),
                })
            }
            TimelineEvent::DateChange { task_id, start, end } => {
                let key = record_key_for(&task_id)?;
                let Some(record) = store.get(key)? else {
                    log::warn!("Record {} no longer exists; date change dropped", key);
                    return Ok(EventOutcome::Missing(key.to_string()));
                };
                let update = translate_date_change(&record, &roles, start, end)?;
                self.write(store, &update)
            }
            TimelineEvent::ProgressChange { task_id, progress } => {
                let key = record_key_for(&task_id)?;
                let Some(record) = store.get(key)? else {
                    log::warn!("Record {} no longer exists; progress change dropped", key);
                    return Ok(EventOutcome::Missing(key.to_string()));
                };
                let update = translate_progress_change(&record, &roles, progress)?;
                self.write(store, &update)
            }
            TimelineEvent::DateClick { date, key, name } => {
                if store.get(&key)?.is_some() {
                    bail!("Record already exists: {}", key);
                }
                let mut record = Record::new(key);
                record.name = name;
                record.fields = seed_fields(&roles, date)?;
                let created = store.create(&record)?;
                log::info!("Created {} at {}", created.key, date);
                self.tasks.clear();
                Ok(EventOutcome::Created(created))
            }
        }
    }

    /// Handle events in the order they were observed. Each event is written
    /// on its own; a failing event does not stop the ones after it.
    pub fn handle_events<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        events: impl IntoIterator<Item = TimelineEvent>,
    ) -> Vec<Result<EventOutcome>> {
        events
            .into_iter()
            .map(|event| {
                let result = self.handle_event(store, event);
                if let Err(e) = &result {
                    log::warn!("Timeline event failed: {:#}", e);
                }
                result
            })
            .collect()
    }

    fn write<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        update: &crate::timeline::edit::FieldUpdate,
    ) -> Result<EventOutcome> {
        let outcome = apply_update(store, update)?;
        if let WriteOutcome::Written(_) = outcome {
            // The rendered list no longer matches the records
            self.tasks.clear();
        }
        Ok(match outcome {
            WriteOutcome::RecordMissing => EventOutcome::Missing(update.record_key.clone()),
            outcome => EventOutcome::Written {
                key: update.record_key.clone(),
                outcome,
            },
        })
    }
}
