use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Role, RoleAssignment};

pub const MIN_BAR_THICKNESS: u8 = 16;
pub const MAX_BAR_THICKNESS: u8 = 60;
pub const DEFAULT_BAR_THICKNESS: u8 = 28;

/// Every setting key the timeline understands
pub const SETTING_KEYS: &[&str] = &[
    "role.start",
    "role.end",
    "role.label",
    "role.dependencies",
    "role.color_by",
    "role.progress",
    "group_by",
    "view.granularity",
    "view.bar_thickness",
    "view.show_progress",
    "view.show_expected_progress",
];

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unknown setting '{0}'")]
    UnknownKey(String),
    #[error("Unknown role '{0}'. Roles: start, end, label, dependencies, color_by, progress")]
    UnknownRole(String),
    #[error("Invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Time scale of the rendered timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewGranularity {
    QuarterDay,
    HalfDay,
    Day,
    #[default]
    Week,
    Month,
    Year,
}

impl ViewGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewGranularity::QuarterDay => "quarter-day",
            ViewGranularity::HalfDay => "half-day",
            ViewGranularity::Day => "day",
            ViewGranularity::Week => "week",
            ViewGranularity::Month => "month",
            ViewGranularity::Year => "year",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quarter-day" | "quarter_day" => Some(ViewGranularity::QuarterDay),
            "half-day" | "half_day" => Some(ViewGranularity::HalfDay),
            "day" => Some(ViewGranularity::Day),
            "week" => Some(ViewGranularity::Week),
            "month" => Some(ViewGranularity::Month),
            "year" => Some(ViewGranularity::Year),
            _ => None,
        }
    }

    /// Length of one timeline column, in days
    pub fn column_days(&self) -> f64 {
        match self {
            ViewGranularity::QuarterDay => 0.25,
            ViewGranularity::HalfDay => 0.5,
            ViewGranularity::Day => 1.0,
            ViewGranularity::Week => 7.0,
            ViewGranularity::Month => 30.0,
            ViewGranularity::Year => 365.0,
        }
    }
}

/// Display options handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub granularity: ViewGranularity,
    pub bar_thickness: u8,
    pub show_progress: bool,
    pub show_expected_progress: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            granularity: ViewGranularity::default(),
            bar_thickness: DEFAULT_BAR_THICKNESS,
            show_progress: true,
            show_expected_progress: false,
        }
    }
}

/// Full timeline configuration: pinned roles, grouping, display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    pub roles: RoleAssignment,
    pub group_by: Option<String>,
    pub display: DisplayConfig,
}

impl TimelineConfig {
    /// Apply one `key=value` setting
    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        if let Some(role_name) = key.strip_prefix("role.") {
            let role = Role::from_str(role_name)
                .ok_or_else(|| ConfigError::UnknownRole(role_name.to_string()))?;
            self.roles.set(role, Some(value.to_string()));
            return Ok(());
        }

        match key {
            "group_by" => {
                self.group_by = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            "view.granularity" => {
                self.display.granularity = ViewGranularity::from_str(value)
                    .ok_or_else(|| invalid(key, value, "expected quarter-day, half-day, day, week, month or year"))?;
            }
            "view.bar_thickness" => {
                self.display.bar_thickness = parse_bar_thickness(value)
                    .ok_or_else(|| invalid(key, value, "expected an integer between 16 and 60"))?;
            }
            "view.show_progress" => {
                self.display.show_progress = parse_bool(value)
                    .ok_or_else(|| invalid(key, value, "expected true or false"))?;
            }
            "view.show_expected_progress" => {
                self.display.show_expected_progress = parse_bool(value)
                    .ok_or_else(|| invalid(key, value, "expected true or false"))?;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Current value of a setting, for display
    pub fn setting(&self, key: &str) -> Option<String> {
        if let Some(role_name) = key.strip_prefix("role.") {
            return Role::from_str(role_name).and_then(|r| self.roles.get(r).map(str::to_string));
        }
        match key {
            "group_by" => self.group_by.clone(),
            "view.granularity" => Some(self.display.granularity.as_str().to_string()),
            "view.bar_thickness" => Some(self.display.bar_thickness.to_string()),
            "view.show_progress" => Some(self.display.show_progress.to_string()),
            "view.show_expected_progress" => Some(self.display.show_expected_progress.to_string()),
            _ => None,
        }
    }
}

pub fn parse_bar_thickness(value: &str) -> Option<u8> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|t| (MIN_BAR_THICKNESS..=MAX_BAR_THICKNESS).contains(t))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
