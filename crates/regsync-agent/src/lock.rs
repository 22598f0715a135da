//! `SQLite`-backed cluster lock.
//!
//! All service instances share one lock database; a row in `sync_locks` is
//! the lock. Acquisition is a single conditional insert, so it never
//! blocks. Rows older than the lease are treated as left behind by a dead
//! holder and taken over. Dropping the guard deletes the row.

use regsync_core::{LockError, SyncLock};
use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Lease after which an unreleased lock may be taken over.
const DEFAULT_LEASE: Duration = Duration::from_secs(60);

/// `SQLite`-backed implementation of the cluster lock.
pub struct SqliteLockRegistry {
    conn: Arc<Mutex<Connection>>,
    holder: String,
    lease: Duration,
}

impl SqliteLockRegistry {
    /// Open or create the shared lock database.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or initialized.
    pub fn open(path: &Path, holder: Uuid) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, holder)
    }

    /// Create an in-memory lock database (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be created.
    pub fn in_memory(holder: Uuid) -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, holder)
    }

    fn from_connection(conn: Connection, holder: Uuid) -> SqliteResult<Self> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS sync_locks (
                name TEXT PRIMARY KEY,
                holder TEXT NOT NULL,
                acquired_at INTEGER NOT NULL
            );
            ",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            holder: holder.to_string(),
            lease: DEFAULT_LEASE,
        })
    }

    fn now_secs() -> i64 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        i64::try_from(now).unwrap_or(i64::MAX)
    }
}

impl SyncLock for SqliteLockRegistry {
    type Guard = SqliteLockGuard;

    fn try_acquire(&self, name: &str) -> Result<Option<SqliteLockGuard>, LockError> {
        let conn = self.conn.lock().map_err(|e| LockError(e.to_string()))?;

        let now = Self::now_secs();
        let expiry = now.saturating_sub(i64::try_from(self.lease.as_secs()).unwrap_or(i64::MAX));

        conn.execute(
            "DELETE FROM sync_locks WHERE name = ?1 AND acquired_at < ?2",
            (name, expiry),
        )
        .map_err(|e| LockError(e.to_string()))?;

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO sync_locks (name, holder, acquired_at) VALUES (?1, ?2, ?3)",
                (name, &self.holder, now),
            )
            .map_err(|e| LockError(e.to_string()))?;

        if inserted == 0 {
            return Ok(None);
        }

        Ok(Some(SqliteLockGuard {
            conn: Arc::clone(&self.conn),
            name: name.to_string(),
            holder: self.holder.clone(),
        }))
    }
}

/// Guard for a held lock; releases on drop.
pub struct SqliteLockGuard {
    conn: Arc<Mutex<Connection>>,
    name: String,
    holder: String,
}

impl Drop for SqliteLockGuard {
    fn drop(&mut self) {
        let Ok(conn) = self.conn.lock() else {
            return;
        };
        if let Err(err) = conn.execute(
            "DELETE FROM sync_locks WHERE name = ?1 AND holder = ?2",
            (&self.name, &self.holder),
        ) {
            tracing::warn!(name = %self.name, error = %err, "Failed to release lock");
        }
    }
}
