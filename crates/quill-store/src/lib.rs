//! SQLite persistence for Quill.
//!
//! One [`SqliteStore`] implements every storage and collaborator port: the
//! job queue, sprints, XP and stats, projects, settings and goals. Several
//! worker processes may open the same file; WAL mode and a busy timeout keep
//! them from tripping over each other, and the job claim is a single
//! conditional update.

mod goals;
mod jobs;
mod projects;
mod schema;
mod sprints;
mod users;

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use quill_scheduler::StoreError;
use rusqlite::Connection;
use tracing::info;

pub use users::{guild_setting, setting};

/// How long a write waits for another process's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database file, creating the schema if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| backend(&e))?;

        // Enable WAL mode so shards can read while one writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| backend(&e))?;

        let store = Self::with_connection(conn)?;
        info!(path = %path.display(), "database initialized");
        Ok(store)
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| backend(&e))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(|e| backend(&e))?;
        conn.execute_batch(schema::SCHEMA).map_err(|e| backend(&e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` against the connection, mapping failures to [`StoreError`].
    fn with_conn<T>(
        &self,
        table: &'static str,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Backend("connection mutex poisoned".to_string()))?;
        f(&mut *conn).map_err(|e| match e {
            rusqlite::Error::FromSqlConversionFailure(_, _, reason) => StoreError::Corrupt {
                table,
                reason: reason.to_string(),
            },
            other => backend(&other),
        })
    }
}

fn backend(e: &rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Conversion failure for a column whose text does not parse.
fn bad_value(column: usize, reason: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_twice_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quill.db");

        SqliteStore::open(&path).unwrap();
        SqliteStore::open(&path).unwrap();
    }

    #[test]
    fn test_corrupt_rows_are_reported_with_table() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .with_conn("jobs", |_| Err::<(), _>(bad_value(2, "bad schedule".to_string())))
            .unwrap_err();

        assert!(matches!(err, StoreError::Corrupt { table: "jobs", .. }));
    }
}
