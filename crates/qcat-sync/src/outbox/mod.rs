//! Durable queue of pending fact-base mutations.
//!
//! Change capture only ever enqueues; the [`SyncWorker`](crate::SyncWorker)
//! drains entries in sequence order and acknowledges each one once the fact
//! base has accepted it. A failed entry stays queued with its attempt count
//! and next retry time.

mod memory;
mod sqlite;

pub use memory::MemoryOutbox;
pub use sqlite::SqliteOutbox;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::fact::{FactKey, FactMutation};

/// One queued mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Monotonic sequence number assigned at enqueue time.
    pub seq: u64,
    pub mutation: FactMutation,
    /// Failed delivery attempts so far.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    /// Earliest time of the next attempt. `None` means immediately.
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    pub fn new(seq: u64, mutation: FactMutation) -> Self {
        Self {
            seq,
            mutation,
            attempts: 0,
            last_error: None,
            enqueued_at: Utc::now(),
            next_attempt_at: None,
        }
    }

    pub fn key(&self) -> FactKey {
        self.mutation.key()
    }

    /// Whether this entry may be attempted at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at.is_none_or(|at| at <= now)
    }
}

/// Queue of pending mutations.
#[async_trait]
pub trait Outbox: Send + Sync {
    /// Append a mutation and return its sequence number.
    async fn enqueue(&self, mutation: FactMutation) -> SyncResult<u64>;

    /// Up to `limit` oldest entries, in sequence order, due or not.
    async fn pending(&self, limit: usize) -> SyncResult<Vec<OutboxEntry>>;

    /// Remove a delivered entry.
    async fn ack(&self, seq: u64) -> SyncResult<()>;

    /// Record a failed attempt and schedule the next one.
    async fn record_failure(
        &self,
        seq: u64,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> SyncResult<()>;

    /// Number of queued entries.
    async fn len(&self) -> SyncResult<usize>;

    async fn is_empty(&self) -> SyncResult<bool> {
        Ok(self.len().await? == 0)
    }
}
