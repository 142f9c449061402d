use rusqlite::{Connection, Result, Transaction};

type Migration = fn(&Transaction) -> Result<()>;

/// Schema migrations in version order; the last entry is the current schema
const MIGRATIONS: &[(u32, Migration)] = &[(1, migration_v1)];

/// Brings a database up to the current schema
pub struct MigrationManager;

impl MigrationManager {
    /// Create the version table if needed and apply every pending migration,
    /// each in its own transaction
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        let applied = Self::get_version(conn)?;
        for &(version, migrate) in MIGRATIONS.iter().filter(|(v, _)| *v > applied) {
            let tx = conn.unchecked_transaction()?;
            migrate(&tx)?;
            tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
            tx.commit()?;
            log::debug!("Applied schema migration v{}", version);
        }
        Ok(())
    }

    /// Highest applied migration, 0 for a fresh database
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

/// Migration v1: Initial schema
fn migration_v1(tx: &Transaction) -> Result<()> {
    // Records table
    // fields_json is a JSON object; key order is significant and preserved
    tx.execute(
        "CREATE TABLE records (
            id INTEGER PRIMARY KEY,
            key TEXT NOT NULL UNIQUE,
            name TEXT NULL,
            fields_json TEXT NOT NULL DEFAULT '{}',
            body TEXT NULL,
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;

    // Timeline settings (role pins, grouping, display options)
    tx.execute(
        "CREATE TABLE settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();
        MigrationManager::initialize(&conn).unwrap();
        let latest = MIGRATIONS.last().map(|(v, _)| *v).unwrap();
        assert_eq!(MigrationManager::get_version(&conn).unwrap(), latest);
    }

    #[test]
    fn test_schema_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        for table in ["records", "settings"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }
}
