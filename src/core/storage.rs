/// SQLite persistence for the service registry and health history
///
/// A single connection guarded by a mutex. Every write is a single-row
/// statement (or one short transaction), so concurrent appends from different
/// services are serialized by the lock and never interleave.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::core::error::StorageError;
use crate::core::models::{CheckType, HealthStatus};

pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database file, creating its parent directory
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::DataDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        debug!(path = %path.display(), "database opened");

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init(conn: &Connection) -> Result<(), StorageError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA foreign_keys = ON;
            ",
        )?;
        migrate(conn)
    }

    /// Run `f` with exclusive access to the connection
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        f(&mut conn)
    }
}

fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS services (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            name             TEXT UNIQUE NOT NULL,
            display_name     TEXT NOT NULL,
            icon_emoji       TEXT NOT NULL DEFAULT '',
            check_type       TEXT NOT NULL CHECK (check_type IN ('http', 'docker', 'both')),
            url              TEXT,
            docker_container TEXT,
            public_url       TEXT,
            enabled          INTEGER NOT NULL DEFAULT 1,
            priority         INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS health_checks (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            service_id       INTEGER NOT NULL REFERENCES services (id),
            status           TEXT NOT NULL CHECK (status IN ('up', 'down', 'degraded', 'unknown')),
            response_time_ms INTEGER CHECK (response_time_ms IS NULL OR response_time_ms >= 0),
            error_message    TEXT,
            checked_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_health_checks_service ON health_checks (service_id, id);
        CREATE INDEX IF NOT EXISTS idx_health_checks_checked_at ON health_checks (checked_at);
        ",
    )?;
    Ok(())
}

impl ToSql for CheckType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CheckType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for HealthStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for HealthStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table_names(db: &Database) -> Vec<String> {
        db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names)
        })
        .unwrap()
    }

    #[test]
    fn test_open_creates_schema() {
        let db = Database::open_in_memory().unwrap();
        let tables = table_names(&db);
        assert!(tables.contains(&"services".to_string()));
        assert!(tables.contains(&"health_checks".to_string()));
        assert!(db.path().is_none());
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dashboard.db");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));

        // Reopening an existing database keeps the schema intact
        drop(db);
        let db = Database::open(&path).unwrap();
        assert_eq!(table_names(&db).iter().filter(|t| *t == "services").count(), 1);
    }

    #[test]
    fn test_status_column_rejects_garbage() {
        let db = Database::open_in_memory().unwrap();
        let result = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO services (name, display_name, check_type) VALUES ('x', 'X', 'http')",
                [],
            )?;
            conn.execute(
                "INSERT INTO health_checks (service_id, status, checked_at) VALUES (1, 'sideways', 'now')",
                [],
            )?;
            Ok(())
        });
        assert!(matches!(result, Err(StorageError::Sqlite(_))));
    }

    #[test]
    fn test_foreign_key_enforced() {
        let db = Database::open_in_memory().unwrap();
        let result = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO health_checks (service_id, status, checked_at) VALUES (42, 'up', 'now')",
                [],
            )?;
            Ok(())
        });
        assert!(result.is_err());
    }
}
