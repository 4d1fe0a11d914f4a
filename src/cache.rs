use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::snapshot::AccountSnapshot;

pub const DEFAULT_TTL_HOURS: i64 = 24;

pub trait SnapshotStore {
    /// Returns the stored snapshot, or `None` when absent or expired.
    fn get(&self, username: &str) -> Result<Option<AccountSnapshot>>;
    fn put(&self, username: &str, snapshot: &AccountSnapshot) -> Result<()>;
    /// Removes every entry and returns how many were dropped.
    fn clear(&self) -> Result<usize>;
}

pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
    ttl: Duration,
}

impl SqliteSnapshotStore {
    pub fn open(path: &Path, ttl: Duration) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open snapshot cache at {:?}", path))?;
        info!(action = "open", component = "snapshot_cache", path = ?path, ttl_hours = ttl.num_hours(), "Opened snapshot cache");
        Self::with_connection(conn, ttl)
    }

    pub fn in_memory(ttl: Duration) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, ttl)
    }

    fn with_connection(conn: Connection, ttl: Duration) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS snapshots (
                username TEXT PRIMARY KEY,
                fetched_at TEXT NOT NULL,
                payload TEXT NOT NULL
            )",
        )
        .context("Failed to create snapshot cache schema")?;

        Ok(SqliteSnapshotStore {
            conn: Mutex::new(conn),
            ttl,
        })
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Snapshot cache lock poisoned"))
    }

    fn put_at(
        &self,
        username: &str,
        snapshot: &AccountSnapshot,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        let payload = snapshot.to_json()?;
        self.connection()?
            .execute(
                "INSERT OR REPLACE INTO snapshots (username, fetched_at, payload) VALUES (?1, ?2, ?3)",
                params![username, fetched_at, payload],
            )
            .with_context(|| format!("Failed to cache snapshot for {}", username))?;
        Ok(())
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn get(&self, username: &str) -> Result<Option<AccountSnapshot>> {
        let row: Option<(DateTime<Utc>, String)> = self
            .connection()?
            .query_row(
                "SELECT fetched_at, payload FROM snapshots WHERE username = ?1",
                params![username],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to query snapshot cache")?;

        let Some((fetched_at, payload)) = row else {
            return Ok(None);
        };

        if Utc::now() - fetched_at >= self.ttl {
            info!(action = "expire", component = "snapshot_cache", username, fetched_at = %fetched_at, "Cached snapshot expired");
            return Ok(None);
        }

        match AccountSnapshot::from_json(&payload) {
            Ok(snapshot) => {
                info!(action = "hit", component = "snapshot_cache", username, "Loaded snapshot from cache");
                Ok(Some(snapshot))
            }
            Err(e) => {
                warn!(action = "decode", component = "snapshot_cache", username, error = %e, "Discarding unreadable cached snapshot");
                Ok(None)
            }
        }
    }

    fn put(&self, username: &str, snapshot: &AccountSnapshot) -> Result<()> {
        self.put_at(username, snapshot, Utc::now())?;
        info!(action = "store", component = "snapshot_cache", username, "Stored snapshot in cache");
        Ok(())
    }

    fn clear(&self) -> Result<usize> {
        let removed = self
            .connection()?
            .execute("DELETE FROM snapshots", [])
            .context("Failed to clear snapshot cache")?;
        info!(action = "clear", component = "snapshot_cache", removed, "Cleared snapshot cache");
        Ok(removed)
    }
}
