// CLI parsing utilities for record commands

use chrono::NaiveDate;
use serde_json::{Map, Number, Value};

use crate::utils::parse_date_str;

/// A parsed `field:value` argument
#[derive(Debug, Clone, PartialEq)]
pub enum FieldArg {
    Set(String, Value),
    /// `field:` with nothing after the colon
    Remove(String),
}

#[derive(Debug, PartialEq)]
pub enum FieldParseError {
    MissingSeparator { token: String },
    EmptyFieldName { token: String },
}

impl std::fmt::Display for FieldParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldParseError::MissingSeparator { token } => {
                write!(f, "Expected field:value, got '{}'", token)
            }
            FieldParseError::EmptyFieldName { token } => {
                write!(f, "Missing field name in '{}'", token)
            }
        }
    }
}

impl std::error::Error for FieldParseError {}

/// Parse one `field:value` token. The first colon separates name and value,
/// so values may contain colons (`start:2026-03-15 09:30`).
pub fn parse_field_arg(token: &str) -> Result<FieldArg, FieldParseError> {
    let Some((field, value)) = token.split_once(':') else {
        return Err(FieldParseError::MissingSeparator {
            token: token.to_string(),
        });
    };
    let field = field.trim();
    if field.is_empty() {
        return Err(FieldParseError::EmptyFieldName {
            token: token.to_string(),
        });
    }

    if value.trim().is_empty() {
        Ok(FieldArg::Remove(field.to_string()))
    } else {
        Ok(FieldArg::Set(field.to_string(), parse_field_value(value)))
    }
}

pub fn parse_field_args(tokens: &[String]) -> Result<Vec<FieldArg>, FieldParseError> {
    tokens.iter().map(|t| parse_field_arg(t)).collect()
}

/// Numbers are stored as JSON numbers, everything else as strings
pub fn parse_field_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::from(n);
    }
    if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(trimmed.to_string())
}

/// Apply parsed arguments to a field map, preserving existing field order
pub fn apply_field_args(fields: &mut Map<String, Value>, args: Vec<FieldArg>) {
    for arg in args {
        match arg {
            FieldArg::Set(name, value) => {
                fields.insert(name, value);
            }
            FieldArg::Remove(name) => {
                fields.shift_remove(&name);
            }
        }
    }
}

/// Parse a date argument (`2026-03-15`, `2026/03/15`, `15 Mar 2026`, ...)
pub fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date_str(raw)
        .map(|instant| instant.date())
        .ok_or_else(|| format!("Invalid date: '{}'. Use YYYY-MM-DD.", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_field_arg() {
        assert_eq!(
            parse_field_arg("status:Done"),
            Ok(FieldArg::Set("status".into(), json!("Done")))
        );
        assert_eq!(
            parse_field_arg("start:2026-03-15 09:30"),
            Ok(FieldArg::Set("start".into(), json!("2026-03-15 09:30")))
        );
        assert_eq!(
            parse_field_arg("depends-on:[[A]], [[B]]"),
            Ok(FieldArg::Set("depends-on".into(), json!("[[A]], [[B]]")))
        );
        assert_eq!(parse_field_arg("progress:"), Ok(FieldArg::Remove("progress".into())));
        assert!(matches!(
            parse_field_arg("status"),
            Err(FieldParseError::MissingSeparator { .. })
        ));
        assert!(matches!(
            parse_field_arg(":Done"),
            Err(FieldParseError::EmptyFieldName { .. })
        ));
    }

    #[test]
    fn test_parse_field_value() {
        assert_eq!(parse_field_value("40"), json!(40));
        assert_eq!(parse_field_value("2.5"), json!(2.5));
        assert_eq!(parse_field_value("2026-03-15"), json!("2026-03-15"));
        assert_eq!(parse_field_value(" High "), json!("High"));
    }

    #[test]
    fn test_apply_field_args() {
        let mut fields = Map::new();
        fields.insert("start".into(), json!("2026-03-01"));
        fields.insert("status".into(), json!("Todo"));
        fields.insert("progress".into(), json!(10));

        let args = parse_field_args(&["status:Done".to_string(), "start:".to_string()]).unwrap();
        apply_field_args(&mut fields, args);

        let names: Vec<&String> = fields.keys().collect();
        assert_eq!(names, vec!["status", "progress"]);
        assert_eq!(fields["status"], json!("Done"));
    }

    #[test]
    fn test_parse_date_arg() {
        assert_eq!(
            parse_date_arg("2026-03-15"),
            Ok(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap())
        );
        assert!(parse_date_arg("next week").is_err());
    }
}
