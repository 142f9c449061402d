//! Grouping and group header synthesis
//!
//! Records are partitioned by the value of a grouping field before mapping;
//! each group is mapped on its own and the results are concatenated, with a
//! synthetic header task in front of every non-empty group.

use crate::models::{group_header_id, Record, TimelineTask};
use crate::timeline::mapper::category_value;

/// Display name of the group holding records without a grouping value
pub const UNGROUPED_LABEL: &str = "Ungrouped";

/// Records sharing a grouping value. `name` is `None` for the unnamed group.
#[derive(Debug, Clone)]
pub struct RecordGroup {
    pub name: Option<String>,
    pub records: Vec<Record>,
}

/// Mapped tasks of one group
#[derive(Debug, Clone)]
pub struct TaskGroup {
    pub name: Option<String>,
    pub tasks: Vec<TimelineTask>,
}

/// Partition records by a field's value, groups in first-seen order.
/// Without a field everything lands in a single unnamed group.
pub fn group_records(records: Vec<Record>, field: Option<&str>) -> Vec<RecordGroup> {
    let Some(field) = field else {
        return vec![RecordGroup { name: None, records }];
    };

    let mut groups: Vec<RecordGroup> = Vec::new();
    for record in records {
        let name = record.field(field).and_then(category_value);
        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.records.push(record),
            None => groups.push(RecordGroup {
                name,
                records: vec![record],
            }),
        }
    }
    groups
}

/// Headers only render for more than one group, or a single named group
pub fn needs_headers(groups: &[TaskGroup]) -> bool {
    match groups {
        [] => false,
        [only] => only.name.is_some(),
        _ => true,
    }
}

/// Header spanning a group's tasks; `None` for a group without tasks
pub fn synthesize_header(group: &TaskGroup) -> Option<TimelineTask> {
    let start = group.tasks.iter().map(|t| t.start).min()?;
    let end = group.tasks.iter().map(|t| t.end).max()?;

    let header = match &group.name {
        Some(name) => TimelineTask::group_header(name, start, end),
        // Id kept apart from any real group value
        None => TimelineTask {
            id: group_header_id(""),
            ..TimelineTask::group_header(UNGROUPED_LABEL, start, end)
        },
    };
    Some(header)
}

/// Concatenate groups into the flat list handed to the renderer
pub fn flatten_groups(groups: Vec<TaskGroup>) -> Vec<TimelineTask> {
    let with_headers = needs_headers(&groups);
    let mut flat = Vec::new();
    for group in groups {
        if with_headers {
            if let Some(header) = synthesize_header(&group) {
                flat.push(header);
            }
        }
        flat.extend(group.tasks);
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(key: &str, start: &str, end: &str) -> TimelineTask {
        TimelineTask {
            id: format!("task:{}", key),
            name: key.to_string(),
            start: date(start),
            end: date(end),
            progress: 40,
            expected_progress: None,
            dependencies: vec!["task:other".to_string()],
            color_bucket: Some(1),
            is_milestone: false,
            source: Some(key.to_string()),
        }
    }

    #[test]
    fn test_group_records_by_field() {
        let records = vec![
            Record::new("a.md").with_field("phase", "Build"),
            Record::new("b.md"),
            Record::new("c.md").with_field("phase", "Plan"),
            Record::new("d.md").with_field("phase", "Build"),
        ];
        let groups = group_records(records, Some("phase"));
        let summary: Vec<_> = groups
            .iter()
            .map(|g| (g.name.as_deref(), g.records.len()))
            .collect();
        assert_eq!(summary, vec![(Some("Build"), 2), (None, 1), (Some("Plan"), 1)]);

        let ungrouped = group_records(vec![Record::new("a.md")], None);
        assert_eq!(ungrouped.len(), 1);
        assert!(ungrouped[0].name.is_none());
    }

    #[test]
    fn test_header_spans_members() {
        let group = TaskGroup {
            name: Some("Build".to_string()),
            tasks: vec![
                task("a", "2026-03-05", "2026-03-09"),
                task("b", "2026-03-01", "2026-03-03"),
                task("c", "2026-03-04", "2026-03-12"),
            ],
        };
        let header = synthesize_header(&group).unwrap();
        assert_eq!(header.id, "group:Build");
        assert_eq!(header.start, date("2026-03-01"));
        assert_eq!(header.end, date("2026-03-12"));
        assert_eq!(header.progress, 0);
        assert!(header.dependencies.is_empty());
        assert!(header.is_group_header());

        let empty = TaskGroup { name: Some("Empty".into()), tasks: vec![] };
        assert!(synthesize_header(&empty).is_none());
    }

    #[test]
    fn test_flatten_places_headers_first() {
        let groups = vec![
            TaskGroup {
                name: Some("Plan".into()),
                tasks: vec![task("a", "2026-03-01", "2026-03-02")],
            },
            TaskGroup {
                name: None,
                tasks: vec![task("b", "2026-03-03", "2026-03-04")],
            },
        ];
        let flat = flatten_groups(groups);
        let ids: Vec<_> = flat.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["group:Plan", "task:a", "group:", "task:b"]);
        assert_eq!(flat[2].name, UNGROUPED_LABEL);
    }

    #[test]
    fn test_headers_only_when_grouping_is_meaningful() {
        let unnamed = vec![TaskGroup {
            name: None,
            tasks: vec![task("a", "2026-03-01", "2026-03-02")],
        }];
        assert!(!needs_headers(&unnamed));
        assert_eq!(flatten_groups(unnamed).len(), 1);

        let named = vec![TaskGroup {
            name: Some("Plan".into()),
            tasks: vec![task("a", "2026-03-01", "2026-03-02")],
        }];
        assert!(needs_headers(&named));
        assert_eq!(flatten_groups(named).len(), 2);
    }
}
