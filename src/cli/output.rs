// Output formatting utilities

use std::io::IsTerminal;

use serde_json::Value;

use crate::models::{Record, Role, TimelineConfig, SETTING_KEYS};
use crate::timeline::detect::{FieldKind, FieldProfile, ResolvedRoles};

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";

// Lines of the record body shown by `show`
const BODY_PREVIEW_LINES: usize = 5;

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    // Fallback to COLUMNS environment variable (set by most shells)
    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

/// Apply bold formatting if in TTY mode
fn bold_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Human-readable form of a raw field value
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Record table: key, name and field names
pub fn format_record_table(records: &[Record]) -> String {
    let tty = is_tty();
    let key_width = records
        .iter()
        .map(|r| r.key.chars().count())
        .max()
        .unwrap_or(0)
        .max(3);
    let name_width = records
        .iter()
        .map(|r| r.display_name().chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = String::new();
    let header = format!("{:<key_width$}  {:<name_width$}  Fields", "Key", "Name");
    out.push_str(&bold_if_tty(&header, tty));
    out.push('\n');
    for record in records {
        let fields: Vec<&str> = record.fields.keys().map(String::as_str).collect();
        out.push_str(&format!(
            "{:<key_width$}  {:<name_width$}  {}\n",
            record.key,
            record.display_name(),
            fields.join(", ")
        ));
    }
    out
}

/// Full record: name, every field, then a short body preview
pub fn format_record_detail(record: &Record) -> String {
    let tty = is_tty();
    let mut out = String::new();
    out.push_str(&bold_if_tty(&record.display_name(), tty));
    out.push('\n');
    out.push_str(&format!("  key: {}\n", record.key));

    let width = record
        .fields
        .keys()
        .map(|k| k.chars().count())
        .max()
        .unwrap_or(0);
    for (name, value) in &record.fields {
        out.push_str(&format!("  {:<width$}  {}\n", name, format_value(value)));
    }

    if let Some(body) = record.body.as_deref().filter(|b| !b.trim().is_empty()) {
        out.push('\n');
        let lines: Vec<&str> = body.lines().collect();
        for line in lines.iter().take(BODY_PREVIEW_LINES) {
            out.push_str(&format!("  | {}\n", line));
        }
        if lines.len() > BODY_PREVIEW_LINES {
            out.push_str(&format!("  | ... ({} more lines)\n", lines.len() - BODY_PREVIEW_LINES));
        }
    }
    out
}

fn kind_label(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Date => "date",
        FieldKind::Numeric => "number",
        FieldKind::Text => "text",
        FieldKind::Other => "other",
    }
}

/// Role table plus the observed fields and their kinds
pub fn format_detection_report(resolved: &ResolvedRoles, fields: &[FieldProfile]) -> String {
    let mut out = String::new();
    out.push_str("Roles:\n");
    for role in Role::ALL {
        let line = match resolved.assignment.get(role) {
            Some(field) if resolved.was_detected(role) => format!("{} (detected)", field),
            Some(field) => format!("{} (pinned)", field),
            None => "-".to_string(),
        };
        out.push_str(&format!("  {:<13} {}\n", role.as_str(), line));
    }

    out.push_str("\nFields:\n");
    if fields.is_empty() {
        out.push_str("  (no records)\n");
    }
    for field in fields {
        out.push_str(&format!("  {:<24} {}\n", field.name, kind_label(field.kind)));
    }

    if !resolved.assignment.is_set(Role::Start) {
        out.push_str("\nNo start field found. Set one with: gantry config set role.start <field>\n");
    }
    out
}

/// Effective value of every setting
pub fn format_config(config: &TimelineConfig) -> String {
    let mut out = String::new();
    for key in SETTING_KEYS {
        let value = config.setting(key).unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("{:<28} {}\n", key, value));
    }
    out
}
