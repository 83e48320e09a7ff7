use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

use crate::errors::StoreError;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Cloneable handle to one SQLite connection, opened once and shared by
/// every thread of the process. Calls are serialized by the lock.
#[derive(Debug, Clone)]
pub struct Database {
    path: String,
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path`. `":memory:"` works too.
    pub fn open(path: impl Into<String>) -> Result<Self, StoreError> {
        let path = path.into();
        let conn = Connection::open(&path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Provides a mutable connection to the closure. Must not be nested.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        // A panic inside another closure leaves the connection itself usable.
        let mut conn = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut conn)
    }
}

/// Apply the bundled schema. Safe to run on every start.
pub fn init_db(db: &Database) -> Result<(), StoreError> {
    db.with_conn(|conn| {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| StoreError::Schema(format!("Failed to apply schema: {e}")))
    })?;

    info!(path = db.path(), "database initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn threads_share_one_in_memory_database() {
        let db = Database::open(":memory:").unwrap();
        init_db(&db).unwrap();
        db.with_conn(|conn| {
            conn.execute("CREATE TABLE marker (id INTEGER)", [])?;
            conn.execute("INSERT INTO marker VALUES (7)", [])?;
            Ok(())
        })
        .unwrap();

        let other = db.clone();
        let seen: i64 = thread::spawn(move || {
            other
                .with_conn(|conn| Ok(conn.query_row("SELECT id FROM marker", [], |r| r.get(0))?))
                .unwrap()
        })
        .join()
        .unwrap();

        assert_eq!(seen, 7);
    }
}
