//! SQLite-backed outbox that survives process restarts.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::error::{SyncError, SyncResult};
use crate::fact::FactMutation;
use crate::outbox::{Outbox, OutboxEntry};

/// Durable outbox stored in a single SQLite table.
pub struct SqliteOutbox {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteOutbox {
    /// Open (or create) an outbox database at the given path.
    pub fn new(path: impl AsRef<Path>) -> SyncResult<Self> {
        let conn = Connection::open(path)?;
        let outbox = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        outbox.init_schema()?;
        Ok(outbox)
    }

    /// Open an in-memory outbox.
    pub fn in_memory() -> SyncResult<Self> {
        let conn = Connection::open_in_memory()?;
        let outbox = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        outbox.init_schema()?;
        Ok(outbox)
    }

    fn lock(&self) -> SyncResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SyncError::DatabaseError(e.to_string()))
    }

    fn init_schema(&self) -> SyncResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS outbox (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_kind TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                op TEXT NOT NULL,
                mutation TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                enqueued_at TEXT NOT NULL,
                next_attempt_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_outbox_entity ON outbox(entity_kind, entity_id);
            "#,
        )?;
        Ok(())
    }
}

fn parse_time(value: &str) -> SyncResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SyncError::DatabaseError(format!("invalid timestamp {value:?}: {e}")))
}

#[async_trait]
impl Outbox for SqliteOutbox {
    async fn enqueue(&self, mutation: FactMutation) -> SyncResult<u64> {
        let conn = self.lock()?;
        let (kind, id) = mutation.key();
        let data = serde_json::to_string(&mutation)?;

        conn.execute(
            r#"
            INSERT INTO outbox (entity_kind, entity_id, op, mutation, enqueued_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            rusqlite::params![
                kind.as_str(),
                id.to_string(),
                mutation.op(),
                data,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(conn.last_insert_rowid() as u64)
    }

    async fn pending(&self, limit: usize) -> SyncResult<Vec<OutboxEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT seq, mutation, attempts, last_error, enqueued_at, next_attempt_at
            FROM outbox ORDER BY seq ASC LIMIT ?1
            "#,
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(rusqlite::params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (seq, data, attempts, last_error, enqueued_at, next_attempt_at) = row?;
            entries.push(OutboxEntry {
                seq: seq as u64,
                mutation: serde_json::from_str(&data)?,
                attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
                last_error,
                enqueued_at: parse_time(&enqueued_at)?,
                next_attempt_at: next_attempt_at.as_deref().map(parse_time).transpose()?,
            });
        }

        Ok(entries)
    }

    async fn ack(&self, seq: u64) -> SyncResult<()> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM outbox WHERE seq = ?1",
            rusqlite::params![seq as i64],
        )?;
        if removed == 0 {
            return Err(SyncError::EntryNotFound(seq));
        }
        Ok(())
    }

    async fn record_failure(
        &self,
        seq: u64,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            r#"
            UPDATE outbox
            SET attempts = attempts + 1, last_error = ?2, next_attempt_at = ?3
            WHERE seq = ?1
            "#,
            rusqlite::params![seq as i64, error, next_attempt_at.to_rfc3339()],
        )?;
        if updated == 0 {
            return Err(SyncError::EntryNotFound(seq));
        }
        Ok(())
    }

    async fn len(&self) -> SyncResult<usize> {
        let conn = self.lock()?;
        let count: Option<i64> = conn
            .query_row("SELECT COUNT(*) FROM outbox", [], |row| row.get(0))
            .optional()?;
        Ok(count.unwrap_or(0) as usize)
    }
}
