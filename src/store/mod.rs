//! SQLite-backed persistence for the catalog and the run ledger.
//!
//! A single connection sits behind a mutex. Every public operation holds the
//! lock for one statement or one transaction, which serializes writers and
//! keeps the usage counter free of lost updates.

pub mod catalog;
pub mod ledger;
pub mod query;
pub mod schema;
pub mod seed;

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub use catalog::{ToolFilter, ToolPage};
pub use ledger::RunFilter;
pub use query::ToolSort;

/// Handle to the application database.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if needed) the database file at `path` and apply the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Unavailable(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        tracing::debug!(path = %path.display(), journal_mode = %mode, "Opened database");
        Self::init(conn)
    }

    /// Open a private in-memory database. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Unavailable("database connection lock poisoned".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Timestamp encoding
// ---------------------------------------------------------------------------

/// Fixed-width UTC text, so lexical order in SQL equals time order.
pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

pub(crate) fn decode_ts(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc))
}

/// Read a timestamp column, reporting bad text as a conversion failure.
pub(crate) fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    decode_ts(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
