use chrono::NaiveDate;
use serde::Serialize;

const TASK_ID_PREFIX: &str = "task:";
const GROUP_ID_PREFIX: &str = "group:";

/// Task id for a record key. Stable across renders.
pub fn task_id_for_key(key: &str) -> String {
    format!("{}{}", TASK_ID_PREFIX, key)
}

/// Synthetic id for a group header; namespaced apart from record tasks.
pub fn group_header_id(group: &str) -> String {
    format!("{}{}", GROUP_ID_PREFIX, group)
}

/// Record key encoded in a task id, if it is a record task id
pub fn key_from_task_id(id: &str) -> Option<&str> {
    id.strip_prefix(TASK_ID_PREFIX)
}

/// Render-ready projection of a record (or of a group of records)
///
/// Tasks are rebuilt from scratch on every refresh and never mutated
/// afterwards. `end >= start` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineTask {
    pub id: String,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// 0..=100
    pub progress: u8,
    /// Share of the span elapsed at render time, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_progress: Option<u8>,
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_bucket: Option<usize>,
    pub is_milestone: bool,
    /// Key of the originating record; `None` for group headers
    pub source: Option<String>,
}

impl TimelineTask {
    /// Synthetic header spanning a group of tasks
    pub fn group_header(group: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id: group_header_id(group),
            name: group.to_string(),
            start,
            end: end.max(start),
            progress: 0,
            expected_progress: None,
            dependencies: Vec::new(),
            color_bucket: None,
            is_milestone: false,
            source: None,
        }
    }

    pub fn is_group_header(&self) -> bool {
        self.source.is_none()
    }

    /// Canonical `YYYY-MM-DD` start, the sort key for dependency ordering
    pub fn start_key(&self) -> String {
        self.start.format(crate::utils::CANONICAL_DATE_FORMAT).to_string()
    }
}
