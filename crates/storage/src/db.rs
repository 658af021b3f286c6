// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database handle and connection plumbing.
//!
//! Runtime pragmas: WAL journal mode for concurrent readers, a busy timeout
//! to absorb short lock contention, and foreign keys on. Writes additionally
//! go through [`Store::write`], which retries `SQLITE_BUSY`/`SQLITE_LOCKED`
//! a bounded number of times.

use crate::error::StoreError;
use crate::schema;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Busy timeout applied to every connection.
pub(crate) const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Attempts for the busy-retry wrapper around writes.
const BUSY_RETRIES: u32 = 5;

/// Shared handle to the SQLite database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at `path`, apply pragmas, and migrate
    /// to the latest schema version.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, StoreError> {
        configure_connection(&conn)?;
        schema::migrate(&mut conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Run a read against the connection.
    pub(crate) fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run a write against the connection, retrying on SQLITE_BUSY.
    pub(crate) fn write<T>(
        &self,
        mut f: impl FnMut(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock();
        let mut attempt = 0;
        loop {
            match f(&mut conn) {
                Err(StoreError::Sqlite(err)) if is_busy(&err) && attempt < BUSY_RETRIES => {
                    attempt += 1;
                    warn!(attempt, "sqlite busy, retrying write");
                    std::thread::sleep(Duration::from_millis(10 * u64::from(attempt)));
                }
                other => return other,
            }
        }
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
    )
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

/// Encode a UTC timestamp as microseconds for INTEGER columns.
pub(crate) fn to_us(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_micros()
}

/// Decode a microsecond INTEGER column back to a UTC timestamp.
pub(crate) fn from_us(us: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(us).unwrap_or_default()
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
