use rusqlite::Connection;
use anyhow::{Context, Result};
use crate::models::TimelineConfig;

/// Persisted timeline settings (one `key = value` row per setting)
pub struct ConfigRepo;

impl ConfigRepo {
    /// All stored settings, ordered by key
    pub fn list(conn: &Connection) -> Result<Vec<(String, String)>> {
        let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }
        Ok(settings)
    }

    /// Validate and store a setting
    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        // Reject bad keys/values before they reach the table
        TimelineConfig::default().apply_setting(key, value)?;

        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO settings (key, value, modified_ts) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               modified_ts = excluded.modified_ts",
            rusqlite::params![key, value.trim(), now],
        )
        .with_context(|| format!("Failed to save setting '{}'", key))?;
        Ok(())
    }

    /// Remove a setting. Returns false if it was not set.
    pub fn unset(conn: &Connection, key: &str) -> Result<bool> {
        let removed = conn
            .execute("DELETE FROM settings WHERE key = ?1", [key])
            .with_context(|| format!("Failed to remove setting '{}'", key))?;
        Ok(removed > 0)
    }

    /// Build the timeline configuration from stored settings.
    /// Rows that no longer parse are skipped with a warning.
    pub fn load(conn: &Connection) -> Result<TimelineConfig> {
        let mut config = TimelineConfig::default();
        for (key, value) in Self::list(conn)? {
            if let Err(e) = config.apply_setting(&key, &value) {
                log::warn!("Ignoring stored setting: {}", e);
            }
        }
        Ok(config)
    }
}
