//! Durable queue and offline cache.

use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use courier_types::PendingOperation;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

const LAST_SYNC_KEY: &str = "last_sync_at";

/// Persists the pending-operation queue, cached datasets and sync metadata.
///
/// All methods are blocking. Async callers should run them on a blocking
/// thread.
#[derive(Clone)]
pub struct QueueStore {
    conn: Arc<Mutex<Connection>>,
}

impl QueueStore {
    /// Opens or creates a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        initialize_queue_schema(&conn)?;
        debug!(path = %path.display(), "opened queue store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_queue_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Loads the queue in enqueue order.
    ///
    /// Rows that no longer decode are skipped with a warning rather than
    /// blocking the rest of the queue.
    pub fn load_queue(&self) -> StorageResult<Vec<PendingOperation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT seq, op_json FROM sync_queue ORDER BY seq")?;
        let rows = stmt.query_map([], |row| {
            let seq: i64 = row.get(0)?;
            let json: String = row.get(1)?;
            Ok((seq, json))
        })?;

        let mut queue = Vec::new();
        for row in rows {
            let (seq, json) = row?;
            match serde_json::from_str::<PendingOperation>(&json) {
                Ok(op) => queue.push(op),
                Err(e) => warn!(seq, error = %e, "skipping undecodable queue entry"),
            }
        }
        Ok(queue)
    }

    /// Replaces the persisted queue with `queue` in a single transaction.
    pub fn replace_queue(&self, queue: &[PendingOperation]) -> StorageResult<()> {
        let encoded = queue
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sync_queue", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO sync_queue (op_id, op_json) VALUES (?1, ?2)")?;
            for (op, json) in queue.iter().zip(&encoded) {
                stmt.execute(params![op.id.to_string(), json])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Number of persisted queue entries.
    pub fn queue_len(&self) -> StorageResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Stores `data` under `key`, overwriting any previous value.
    pub fn save_offline_data(&self, key: &str, data: &serde_json::Value) -> StorageResult<()> {
        let json = serde_json::to_string(data)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO offline_data (key, data_json, saved_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
             SET data_json = excluded.data_json, saved_at = excluded.saved_at",
            params![key, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load_offline_data(&self, key: &str) -> StorageResult<Option<serde_json::Value>> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT data_json FROM offline_data WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn record_last_sync(&self, at: DateTime<Utc>) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sync_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![LAST_SYNC_KEY, at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Time of the last completed drain pass, if any.
    pub fn last_sync(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let conn = self.lock()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![LAST_SYNC_KEY],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|v| {
                DateTime::parse_from_rfc3339(&v)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| StorageError::InvalidTimestamp {
                        column: LAST_SYNC_KEY,
                        value: v,
                    })
            })
            .transpose()
    }
}

fn initialize_queue_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sync_queue (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            op_id TEXT NOT NULL UNIQUE,
            op_json TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS offline_data (
            key TEXT PRIMARY KEY,
            data_json TEXT NOT NULL,
            saved_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sync_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}
