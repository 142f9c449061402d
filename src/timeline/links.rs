//! Dependency link resolution
//!
//! Dependency fields hold wiki-style links (`[[Target]]`, `[[Target|Alias]]`)
//! or, failing that, a plain comma-separated list of names. Names resolve to
//! task ids through a [`NameIndex`] built from the record set.

use std::collections::HashMap;

use serde_json::Value;

use crate::models::{task_id_for_key, Record};

/// Targets of every `[[...]]` token in `text`, normalized for lookup
pub fn extract_wiki_links(text: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("[[") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("]]") else {
            break;
        };
        let inner = &after[..close];
        let target = inner.split('|').next().unwrap_or_default();
        if let Some(target) = normalize_target(target) {
            links.push(target);
        }
        rest = &after[close + 2..];
    }

    links
}

/// Names referenced by a raw dependency value.
///
/// The comma-split fallback only applies when the text holds no wiki links
/// at all; it is never used per token.
pub fn dependency_names(raw: &Value) -> Vec<String> {
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Number(n) => n.to_string(),
        _ => return Vec::new(),
    };

    let links = extract_wiki_links(&text);
    if !links.is_empty() {
        return links;
    }
    text.split(',').filter_map(normalize_target).collect()
}

// Drops the heading anchor and a trailing `.md`
fn normalize_target(raw: &str) -> Option<String> {
    let target = raw.split('#').next().unwrap_or_default().trim();
    let target = target.strip_suffix(".md").unwrap_or(target).trim();
    if target.is_empty() {
        None
    } else {
        Some(target.to_string())
    }
}

/// Lookup from record names to task ids
///
/// Each record is indexed under its basename stem, its key without extension
/// and its full key. When two records share a basename the one indexed last
/// wins; fully-qualified keys stay unambiguous.
#[derive(Debug, Default)]
pub struct NameIndex {
    ids: HashMap<String, String>,
}

impl NameIndex {
    pub fn build(records: &[Record]) -> Self {
        let mut ids = HashMap::new();
        for record in records {
            let id = task_id_for_key(&record.key);
            for name in [record.stem(), record.key_without_extension(), record.key.as_str()] {
                if let Some(previous) = ids.insert(name.to_string(), id.clone()) {
                    if previous != id {
                        log::debug!("Name '{}' is ambiguous; resolving to {}", name, id);
                    }
                }
            }
        }
        Self { ids }
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    /// Resolved task ids for a raw dependency value, in reference order.
    /// Unknown names, duplicates and self-references are dropped.
    pub fn resolve_dependencies(&self, raw: &Value, own_id: &str) -> Vec<String> {
        let mut resolved: Vec<String> = Vec::new();
        for name in dependency_names(raw) {
            match self.resolve(&name) {
                Some(id) if id == own_id => {
                    log::debug!("Ignoring self-dependency of {}", own_id);
                }
                Some(id) => {
                    if !resolved.iter().any(|existing| existing == id) {
                        resolved.push(id.to_string());
                    }
                }
                None => log::debug!("Dropping unresolved dependency '{}' of {}", name, own_id),
            }
        }
        resolved
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
