use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record: one item of work-tracking data with free-form fields
///
/// Identified by a stable `key` (typically a path such as
/// `projects/Research.md`). Field order is preserved as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(skip)]
    pub id: Option<i64>,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip)]
    pub created_ts: i64,
    #[serde(skip)]
    pub modified_ts: i64,
}

impl Record {
    /// Create a new record with no fields
    pub fn new(key: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            key: key.into(),
            name: None,
            fields: Map::new(),
            body: None,
            created_ts: now,
            modified_ts: now,
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Last path segment of the key (`projects/Research.md` -> `Research.md`)
    pub fn basename(&self) -> &str {
        self.key.rsplit(['/', '\\']).next().unwrap_or(&self.key)
    }

    /// Key with a trailing file extension removed
    pub fn key_without_extension(&self) -> &str {
        strip_extension(&self.key)
    }

    /// Basename with a trailing file extension removed
    pub fn stem(&self) -> &str {
        strip_extension(self.basename())
    }

    /// Intrinsic display name: the explicit name, otherwise the stem
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.stem().to_string(),
        }
    }

    /// Look up a field; JSON null counts as absent
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }
}

fn strip_extension(s: &str) -> &str {
    let last_sep = s.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    match s[last_sep..].rfind('.') {
        // Leading dot is a hidden file, not an extension
        Some(dot) if dot > 0 => &s[..last_sep + dot],
        _ => s,
    }
}
