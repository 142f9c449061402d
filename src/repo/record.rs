use rusqlite::{Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use anyhow::{Context, Result};
use crate::models::Record;
use crate::timeline::edit::FieldUpdate;

/// Result of writing a field update to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Number of fields that changed
    Written(usize),
    /// Every write matched the stored value
    Unchanged,
    /// The target record no longer exists; nothing was written
    RecordMissing,
}

/// Record source and write sink used by the timeline
///
/// `write_fields` is a read-modify-write of exactly one record: only the
/// named fields change, everything else is preserved as stored.
pub trait RecordStore {
    fn list(&self) -> Result<Vec<Record>>;
    fn get(&self, key: &str) -> Result<Option<Record>>;
    fn write_fields(&self, update: &FieldUpdate) -> Result<WriteOutcome>;
    fn create(&self, record: &Record) -> Result<Record>;
}

/// Record repository for database operations
pub struct RecordRepo;

const RECORD_COLUMNS: &str = "id, key, name, fields_json, body, created_ts, modified_ts";

impl RecordRepo {
    /// Insert a record, or replace name/fields/body of the record with the same key
    pub fn upsert(conn: &Connection, record: &Record) -> Result<Record> {
        let now = chrono::Utc::now().timestamp();
        let fields_json = serde_json::to_string(&record.fields)?;

        conn.execute(
            "INSERT INTO records (key, name, fields_json, body, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(key) DO UPDATE SET
               name = excluded.name,
               fields_json = excluded.fields_json,
               body = excluded.body,
               modified_ts = excluded.modified_ts",
            rusqlite::params![record.key, record.name, fields_json, record.body, now],
        )
        .with_context(|| format!("Failed to save record: {}", record.key))?;

        Self::get_by_key(conn, &record.key)?
            .with_context(|| format!("Record vanished after save: {}", record.key))
    }

    /// Get record by key
    pub fn get_by_key(conn: &Connection, key: &str) -> Result<Option<Record>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM records WHERE key = ?1",
            RECORD_COLUMNS
        ))?;
        let record = stmt.query_row([key], row_to_record).optional()?;
        Ok(record)
    }

    /// List all records in insertion order (the record set's natural order)
    pub fn list_all(conn: &Connection) -> Result<Vec<Record>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM records ORDER BY id",
            RECORD_COLUMNS
        ))?;
        let rows = stmt.query_map([], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// List all record keys in natural order
    pub fn list_keys(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT key FROM records ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    /// Delete a record. Returns false if it did not exist.
    pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
        let deleted = conn
            .execute("DELETE FROM records WHERE key = ?1", [key])
            .with_context(|| format!("Failed to delete record: {}", key))?;
        Ok(deleted > 0)
    }

    /// Apply a field update to one record inside its own transaction
    pub fn write_fields(conn: &Connection, update: &FieldUpdate) -> Result<WriteOutcome> {
        let tx = conn.unchecked_transaction()?;

        let fields_json: Option<String> = tx
            .query_row(
                "SELECT fields_json FROM records WHERE key = ?1",
                [&update.record_key],
                |row| row.get(0),
            )
            .optional()?;
        let Some(fields_json) = fields_json else {
            return Ok(WriteOutcome::RecordMissing);
        };

        // An unreadable map must not be replaced by one holding only the writes
        let mut fields: Map<String, Value> = serde_json::from_str(&fields_json).with_context(|| {
            format!("Stored fields of {} are not a JSON object; nothing written", update.record_key)
        })?;
        let mut changed = 0usize;
        for write in &update.writes {
            if fields.get(&write.field) != Some(&write.value) {
                fields.insert(write.field.clone(), write.value.clone());
                changed += 1;
            }
        }

        if changed == 0 {
            return Ok(WriteOutcome::Unchanged);
        }

        let now = chrono::Utc::now().timestamp();
        tx.execute(
            "UPDATE records SET fields_json = ?1, modified_ts = ?2 WHERE key = ?3",
            rusqlite::params![serde_json::to_string(&fields)?, now, update.record_key],
        )
        .with_context(|| format!("Failed to update record: {}", update.record_key))?;
        tx.commit()?;

        Ok(WriteOutcome::Written(changed))
    }
}

/// `RecordStore` over a SQLite connection
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl RecordStore for SqliteStore<'_> {
    fn list(&self) -> Result<Vec<Record>> {
        RecordRepo::list_all(self.conn)
    }

    fn get(&self, key: &str) -> Result<Option<Record>> {
        RecordRepo::get_by_key(self.conn, key)
    }

    fn write_fields(&self, update: &FieldUpdate) -> Result<WriteOutcome> {
        RecordRepo::write_fields(self.conn, update)
    }

    fn create(&self, record: &Record) -> Result<Record> {
        RecordRepo::upsert(self.conn, record)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let fields_json: String = row.get(3)?;
    Ok(Record {
        id: Some(row.get(0)?),
        key: row.get(1)?,
        name: row.get(2)?,
        fields: parse_fields(&fields_json),
        body: row.get(4)?,
        created_ts: row.get(5)?,
        modified_ts: row.get(6)?,
    })
}

fn parse_fields(json: &str) -> Map<String, Value> {
    match serde_json::from_str::<Map<String, Value>>(json) {
        Ok(fields) => fields,
        Err(e) => {
            log::warn!("Ignoring unreadable record fields: {}", e);
            Map::new()
        }
    }
}
