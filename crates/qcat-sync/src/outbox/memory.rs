//! Volatile outbox.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::{SyncError, SyncResult};
use crate::fact::FactMutation;
use crate::outbox::{Outbox, OutboxEntry};

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    entries: BTreeMap<u64, OutboxEntry>,
}

/// In-memory outbox. Entries do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryOutbox {
    inner: Mutex<Inner>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Outbox for MemoryOutbox {
    async fn enqueue(&self, mutation: FactMutation) -> SyncResult<u64> {
        let mut inner = self.inner.lock().await;
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.entries.insert(seq, OutboxEntry::new(seq, mutation));
        Ok(seq)
    }

    async fn pending(&self, limit: usize) -> SyncResult<Vec<OutboxEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner.entries.values().take(limit).cloned().collect())
    }

    async fn ack(&self, seq: u64) -> SyncResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .entries
            .remove(&seq)
            .map(|_| ())
            .ok_or(SyncError::EntryNotFound(seq))
    }

    async fn record_failure(
        &self,
        seq: u64,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .entries
            .get_mut(&seq)
            .ok_or(SyncError::EntryNotFound(seq))?;
        entry.attempts += 1;
        entry.last_error = Some(error.to_string());
        entry.next_attempt_at = Some(next_attempt_at);
        Ok(())
    }

    async fn len(&self) -> SyncResult<usize> {
        Ok(self.inner.lock().await.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::FactKind;
    use qcat_model::EntityId;

    #[tokio::test]
    async fn test_fifo_and_ack() {
        let outbox = MemoryOutbox::new();
        let a = EntityId::new();
        let b = EntityId::new();

        let s1 = outbox
            .enqueue(FactMutation::retract(FactKind::Qpu, a))
            .await
            .unwrap();
        let s2 = outbox
            .enqueue(FactMutation::retract(FactKind::Qpu, b))
            .await
            .unwrap();
        assert!(s1 < s2);

        let pending = outbox.pending(10).await.unwrap();
        assert_eq!(pending.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![s1, s2]);
        assert_eq!(outbox.pending(1).await.unwrap().len(), 1);

        outbox.ack(s1).await.unwrap();
        assert_eq!(outbox.len().await.unwrap(), 1);
        assert!(matches!(
            outbox.ack(s1).await,
            Err(SyncError::EntryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_record_failure() {
        let outbox = MemoryOutbox::new();
        let seq = outbox
            .enqueue(FactMutation::retract(FactKind::Implementation, EntityId::new()))
            .await
            .unwrap();
        let later = Utc::now() + chrono::Duration::seconds(30);

        outbox.record_failure(seq, "offline", later).await.unwrap();
        outbox.record_failure(seq, "still offline", later).await.unwrap();

        let entry = &outbox.pending(1).await.unwrap()[0];
        assert_eq!(entry.attempts, 2);
        assert_eq!(entry.last_error.as_deref(), Some("still offline"));
        assert!(!entry.is_due(Utc::now()));
        assert!(entry.is_due(later));
    }
}
