//! Property detection
//!
//! Infers which record field plays which role when the caller has not pinned
//! it. Matching is by field name against ordered keyword lists, with a
//! positional fallback for dates. A field is assigned to at most one role.
//!
//! Results are cached per record-set/config fingerprint: re-running detection
//! against different data mid-session could silently flip an assignment and
//! reinterpret the user's fields.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::Value;

use crate::models::{Record, Role, RoleAssignment};
use crate::utils::parse_date_str;

pub const START_KEYWORDS: &[&str] = &["start", "begin", "from", "created"];
pub const END_KEYWORDS: &[&str] = &["end", "due", "finish", "deadline", "until"];
pub const PROGRESS_KEYWORDS: &[&str] = &["progress", "percent", "completion", "complete", "done"];
pub const DEPENDENCY_KEYWORDS: &[&str] = &["depend", "block", "after", "prerequisite", "requires"];
pub const CATEGORY_KEYWORDS: &[&str] = &["status", "priority", "type", "category", "phase", "stage"];

/// Primitive kind inferred from a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Date,
    Numeric,
    Text,
    Other,
}

/// A field observed on the record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldProfile {
    pub name: String,
    pub kind: FieldKind,
}

/// Effective role assignment plus which roles were filled by detection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRoles {
    pub assignment: RoleAssignment,
    pub detected: Vec<Role>,
}

impl ResolvedRoles {
    pub fn was_detected(&self, role: Role) -> bool {
        self.detected.contains(&role)
    }
}

/// Kind of a single value; `None` when the value says nothing (null)
pub fn infer_kind(value: &Value) -> Option<FieldKind> {
    match value {
        Value::Null => None,
        Value::Number(_) => Some(FieldKind::Numeric),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => {
            if parse_date_str(s).is_some() {
                Some(FieldKind::Date)
            } else if s.trim().parse::<f64>().is_ok() {
                Some(FieldKind::Numeric)
            } else {
                Some(FieldKind::Text)
            }
        }
        // Lists of links are textual
        Value::Array(items) if items.iter().all(Value::is_string) => Some(FieldKind::Text),
        _ => Some(FieldKind::Other),
    }
}

/// Profile of every field seen on the record set, in first-seen order.
/// A field's kind comes from its first non-empty value.
pub fn profile_fields(records: &[Record]) -> Vec<FieldProfile> {
    let mut order: Vec<String> = Vec::new();
    let mut kinds: HashMap<String, Option<FieldKind>> = HashMap::new();

    for record in records {
        for (name, value) in &record.fields {
            let slot = kinds.entry(name.clone()).or_insert_with(|| {
                order.push(name.clone());
                None
            });
            if slot.is_none() {
                *slot = infer_kind(value);
            }
        }
    }

    order
        .into_iter()
        .map(|name| {
            let kind = kinds.get(&name).copied().flatten().unwrap_or(FieldKind::Other);
            FieldProfile { name, kind }
        })
        .collect()
}

/// Fill every role the caller left unset
pub fn detect_roles(fields: &[FieldProfile], pinned: &RoleAssignment) -> ResolvedRoles {
    let of_kind = |kind: FieldKind| -> Vec<&str> {
        fields
            .iter()
            .filter(|f| f.kind == kind)
            .map(|f| f.name.as_str())
            .collect()
    };
    let dates = of_kind(FieldKind::Date);
    let numbers = of_kind(FieldKind::Numeric);
    let texts = of_kind(FieldKind::Text);

    let mut state = Detection::new(pinned);

    // Keyword matches first, for both date roles
    state.keyword(Role::Start, &dates, START_KEYWORDS);
    state.keyword(Role::End, &dates, END_KEYWORDS);

    // Positional fallback: first free date field is the start, the next the end
    state.positional(Role::Start, &dates);
    state.positional(Role::End, &dates);

    state.keyword(Role::Progress, &numbers, PROGRESS_KEYWORDS);
    state.keyword(Role::Dependencies, &texts, DEPENDENCY_KEYWORDS);
    state.keyword(Role::ColorBy, &texts, CATEGORY_KEYWORDS);

    ResolvedRoles {
        assignment: state.assignment,
        detected: state.detected,
    }
}

struct Detection {
    assignment: RoleAssignment,
    detected: Vec<Role>,
    taken: HashSet<String>,
}

impl Detection {
    fn new(pinned: &RoleAssignment) -> Self {
        Self {
            assignment: pinned.clone(),
            detected: Vec::new(),
            taken: pinned.assigned().map(|(_, f)| f.to_string()).collect(),
        }
    }

    fn keyword(&mut self, role: Role, candidates: &[&str], keywords: &[&str]) {
        if self.assignment.is_set(role) {
            return;
        }
        if let Some(field) = match_keywords(candidates, keywords, &self.taken) {
            self.claim(role, field);
        }
    }

    fn positional(&mut self, role: Role, candidates: &[&str]) {
        if self.assignment.is_set(role) {
            return;
        }
        if let Some(field) = first_free(candidates, &self.taken) {
            self.claim(role, field);
        }
    }

    fn claim(&mut self, role: Role, field: &str) {
        log::debug!("Detected {} role: '{}'", role.as_str(), field);
        self.assignment.set(role, Some(field.to_string()));
        self.taken.insert(field.to_string());
        self.detected.push(role);
    }
}

fn match_keywords<'a>(
    candidates: &[&'a str],
    keywords: &[&str],
    taken: &HashSet<String>,
) -> Option<&'a str> {
    keywords.iter().find_map(|keyword| {
        candidates
            .iter()
            .copied()
            .find(|field| !taken.contains(*field) && field.to_lowercase().contains(keyword))
    })
}

fn first_free<'a>(candidates: &[&'a str], taken: &HashSet<String>) -> Option<&'a str> {
    candidates.iter().copied().find(|field| !taken.contains(*field))
}

/// Detection result cached until the record set or configuration changes
#[derive(Debug, Default)]
pub struct RoleCache {
    entry: Option<(u64, ResolvedRoles)>,
}

impl RoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved roles for this record set, detecting only on a cache miss
    pub fn resolve(&mut self, records: &[Record], pinned: &RoleAssignment) -> &ResolvedRoles {
        let fingerprint = fingerprint(records, pinned);
        if self.entry.as_ref().is_some_and(|(fp, _)| *fp != fingerprint) {
            log::debug!("Record set or configuration changed; re-running detection");
            self.entry = None;
        }

        let (_, resolved) = self.entry.get_or_insert_with(|| {
            let fields = profile_fields(records);
            (fingerprint, detect_roles(&fields, pinned))
        });
        resolved
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_cached(&self) -> bool {
        self.entry.is_some()
    }
}

// Identity of the record set (keys and field names) plus the pinned roles.
// Field values are deliberately left out: editing a value must not flip
// an assignment.
fn fingerprint(records: &[Record], pinned: &RoleAssignment) -> u64 {
    let mut hasher = DefaultHasher::new();
    pinned.hash(&mut hasher);
    records.len().hash(&mut hasher);
    for record in records {
        record.key.hash(&mut hasher);
        for name in record.fields.keys() {
            name.hash(&mut hasher);
        }
    }
    hasher.finish()
}
