// Error handling utilities for consistent error messages and exit codes

use std::process;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing records, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Exit with an internal error (exit code >1)
/// Internal errors are for unexpected system failures, database corruption, etc.
pub fn internal_error(message: &str) -> ! {
    eprintln!("Internal error: {}", message);
    process::exit(2);
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate a record key: non-empty, single line, no surrounding whitespace
pub fn validate_record_key(key: &str) -> Result<(), String> {
    validate_non_empty(key, "Record key")?;
    if key.trim() != key {
        return Err(format!("Invalid record key: '{}'. Remove the surrounding whitespace.", key));
    }
    if key.chars().any(char::is_control) {
        return Err("Invalid record key: control characters are not allowed.".to_string());
    }
    Ok(())
}

/// Validate a progress value (0-100)
pub fn validate_progress(value: i64) -> Result<i64, String> {
    if (0..=100).contains(&value) {
        Ok(value)
    } else {
        Err(format!("Invalid progress: {}. Progress must be between 0 and 100.", value))
    }
}
