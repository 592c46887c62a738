//! In-memory fact base for tests and local runs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use qcat_model::EntityId;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::error::{SyncError, SyncResult};
use crate::fact::{Fact, FactKind, FactMutation, ImplementationFact, QpuFact};
use crate::factbase::FactBase;

/// In-memory fact base.
///
/// Keeps a log of every mutation it accepted and can be switched into an
/// unavailable mode to exercise retry paths.
#[derive(Debug, Default)]
pub struct InMemoryFactBase {
    implementations: RwLock<FxHashMap<EntityId, ImplementationFact>>,
    qpus: RwLock<FxHashMap<EntityId, QpuFact>>,
    log: RwLock<Vec<FactMutation>>,
    unavailable: AtomicBool,
    fail_next: AtomicUsize,
}

impl InMemoryFactBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Make the next `n` calls fail.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub async fn get_implementation(&self, id: EntityId) -> Option<ImplementationFact> {
        self.implementations.read().await.get(&id).cloned()
    }

    pub async fn get_qpu(&self, id: EntityId) -> Option<QpuFact> {
        self.qpus.read().await.get(&id).cloned()
    }

    /// Total number of records.
    pub async fn len(&self) -> usize {
        self.implementations.read().await.len() + self.qpus.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Mutations accepted so far, in order.
    pub async fn log(&self) -> Vec<FactMutation> {
        self.log.read().await.clone()
    }

    fn check_available(&self) -> SyncResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SyncError::FactBaseUnavailable(
                "in-memory fact base is offline".into(),
            ));
        }
        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(SyncError::FactBaseUnavailable("injected failure".into()));
        }
        Ok(())
    }

    async fn record(&self, mutation: FactMutation) {
        self.log.write().await.push(mutation);
    }
}

#[async_trait]
impl FactBase for InMemoryFactBase {
    async fn assert_implementation(&self, fact: &ImplementationFact) -> SyncResult<()> {
        self.check_available()?;
        self.implementations.write().await.insert(fact.id, fact.clone());
        self.record(FactMutation::assert(Fact::Implementation(fact.clone())))
            .await;
        Ok(())
    }

    async fn update_implementation(&self, fact: &ImplementationFact) -> SyncResult<()> {
        self.check_available()?;
        self.implementations.write().await.insert(fact.id, fact.clone());
        self.record(FactMutation::update(Fact::Implementation(fact.clone())))
            .await;
        Ok(())
    }

    async fn retract_implementation(&self, id: EntityId) -> SyncResult<()> {
        self.check_available()?;
        self.implementations.write().await.remove(&id);
        self.record(FactMutation::retract(FactKind::Implementation, id))
            .await;
        Ok(())
    }

    async fn assert_qpu(&self, fact: &QpuFact) -> SyncResult<()> {
        self.check_available()?;
        self.qpus.write().await.insert(fact.id, fact.clone());
        self.record(FactMutation::assert(Fact::Qpu(fact.clone()))).await;
        Ok(())
    }

    async fn update_qpu(&self, fact: &QpuFact) -> SyncResult<()> {
        self.check_available()?;
        self.qpus.write().await.insert(fact.id, fact.clone());
        self.record(FactMutation::update(Fact::Qpu(fact.clone()))).await;
        Ok(())
    }

    async fn retract_qpu(&self, id: EntityId) -> SyncResult<()> {
        self.check_available()?;
        self.qpus.write().await.remove(&id);
        self.record(FactMutation::retract(FactKind::Qpu, id)).await;
        Ok(())
    }

    async fn fact_ids(&self, kind: FactKind) -> SyncResult<Vec<EntityId>> {
        self.check_available()?;
        let mut ids: Vec<EntityId> = match kind {
            FactKind::Implementation => self.implementations.read().await.keys().copied().collect(),
            FactKind::Qpu => self.qpus.read().await.keys().copied().collect(),
        };
        ids.sort();
        Ok(ids)
    }
}
