//! Change capture on persistence lifecycle events.
//!
//! The persistence layer calls a [`PersistenceListener`] after every
//! successful insert, update and delete of any catalog entity. The
//! [`ChangeCaptureListener`] forwards only implementations and QPUs, turning
//! each event into a fact mutation on the outbox. Everything else is
//! ignored.

use std::sync::Arc;

use async_trait::async_trait;
use qcat_model::{CatalogEntity, Identifiable};
use tokio::sync::Notify;

use crate::error::SyncResult;
use crate::fact::{FactMutation, ToFact, fact_kind_of};
use crate::outbox::Outbox;

/// Persistence lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    PostInsert,
    PostUpdate,
    PostDelete,
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::PostInsert => "post_insert",
            LifecyclePhase::PostUpdate => "post_update",
            LifecyclePhase::PostDelete => "post_delete",
        }
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle hooks invoked by the persistence layer.
///
/// Hooks never fail the persistence operation that triggered them.
#[async_trait]
pub trait PersistenceListener: Send + Sync {
    async fn post_insert(&self, entity: &dyn CatalogEntity);

    async fn post_update(&self, entity: &dyn CatalogEntity);

    async fn post_delete(&self, entity: &dyn CatalogEntity);
}

/// Listener that records fact mutations for implementations and QPUs.
#[derive(Clone)]
pub struct ChangeCaptureListener {
    outbox: Arc<dyn Outbox>,
    notify: Option<Arc<Notify>>,
}

impl ChangeCaptureListener {
    pub fn new(outbox: Arc<dyn Outbox>) -> Self {
        Self {
            outbox,
            notify: None,
        }
    }

    /// Wake a sync worker whenever a mutation is enqueued.
    pub fn with_notify(mut self, notify: Arc<Notify>) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Fact mutation for a lifecycle event, or `None` when the entity kind
    /// has no fact representation.
    pub fn translate(
        phase: LifecyclePhase,
        entity: &dyn CatalogEntity,
    ) -> SyncResult<Option<FactMutation>> {
        let Some(entity) = entity.as_synchronizable() else {
            return Ok(None);
        };

        let mutation = match phase {
            LifecyclePhase::PostInsert => FactMutation::assert(entity.to_fact()?),
            LifecyclePhase::PostUpdate => FactMutation::update(entity.to_fact()?),
            LifecyclePhase::PostDelete => {
                FactMutation::retract(fact_kind_of(&entity), entity.id())
            }
        };
        Ok(Some(mutation))
    }

    /// Translate and enqueue one event. Returns the outbox sequence number,
    /// or `None` if the event was ignored.
    pub async fn capture(
        &self,
        phase: LifecyclePhase,
        entity: &dyn CatalogEntity,
    ) -> SyncResult<Option<u64>> {
        let Some(mutation) = Self::translate(phase, entity)? else {
            tracing::debug!(phase = %phase, kind = %entity.kind(), id = %entity.id(), "Ignoring lifecycle event");
            return Ok(None);
        };

        let seq = self.outbox.enqueue(mutation).await?;
        tracing::debug!(phase = %phase, kind = %entity.kind(), id = %entity.id(), seq, "Captured change");

        if let Some(notify) = &self.notify {
            notify.notify_one();
        }
        Ok(Some(seq))
    }

    async fn handle(&self, phase: LifecyclePhase, entity: &dyn CatalogEntity) {
        if let Err(e) = self.capture(phase, entity).await {
            tracing::error!(
                phase = %phase,
                kind = %entity.kind(),
                id = %entity.id(),
                "Failed to capture change: {}",
                e
            );
        }
    }
}

#[async_trait]
impl PersistenceListener for ChangeCaptureListener {
    async fn post_insert(&self, entity: &dyn CatalogEntity) {
        self.handle(LifecyclePhase::PostInsert, entity).await;
    }

    async fn post_update(&self, entity: &dyn CatalogEntity) {
        self.handle(LifecyclePhase::PostUpdate, entity).await;
    }

    async fn post_delete(&self, entity: &dyn CatalogEntity) {
        self.handle(LifecyclePhase::PostDelete, entity).await;
    }
}

impl std::fmt::Debug for ChangeCaptureListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeCaptureListener")
            .field("notify", &self.notify.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::fact::{Fact, FactKind};
    use crate::outbox::MemoryOutbox;
    use qcat_model::{
        Algorithm, EntityId, Implementation, ProgrammingLanguage, Provider, Qpu, Sdk, SdkRef,
    };

    fn listener() -> (Arc<MemoryOutbox>, ChangeCaptureListener) {
        let outbox = Arc::new(MemoryOutbox::new());
        (outbox.clone(), ChangeCaptureListener::new(outbox))
    }

    #[tokio::test]
    async fn test_non_synchronizable_kinds_are_ignored() {
        let (outbox, listener) = listener();
        let algorithm = Algorithm::new("Grover");
        let provider = Provider::new("IBMQ");
        let sdk = Sdk::new("Qiskit");

        for entity in [
            &algorithm as &dyn CatalogEntity,
            &provider as &dyn CatalogEntity,
            &sdk as &dyn CatalogEntity,
        ] {
            listener.post_insert(entity).await;
            listener.post_update(entity).await;
            listener.post_delete(entity).await;
            assert_eq!(
                listener
                    .capture(LifecyclePhase::PostInsert, entity)
                    .await
                    .unwrap(),
                None
            );
        }

        assert!(outbox.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_phases_map_to_mutations() {
        let (outbox, listener) = listener();
        let qpu = Qpu::new("ibmq_16_melbourne", 15).with_sdk(SdkRef::new("Qiskit"));

        listener.post_insert(&qpu).await;
        listener.post_update(&qpu).await;
        listener.post_delete(&qpu).await;

        let ops: Vec<_> = outbox
            .pending(10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.mutation)
            .collect();
        assert_eq!(ops.len(), 3);
        assert!(matches!(&ops[0], FactMutation::Assert { fact: Fact::Qpu(f) } if f.qubit_count == 15));
        assert!(matches!(&ops[1], FactMutation::Update { .. }));
        assert_eq!(ops[2], FactMutation::retract(FactKind::Qpu, qpu.id()));
    }

    #[tokio::test]
    async fn test_translation_failure_is_contained() {
        let (outbox, listener) = listener();
        let imp = Implementation::new("draft", ProgrammingLanguage::Python);

        // The hook itself must not fail.
        listener.post_insert(&imp).await;
        assert!(outbox.is_empty().await.unwrap());

        let err = listener
            .capture(LifecyclePhase::PostInsert, &imp)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Translation { .. }));

        // Deleting an untranslatable entity still retracts by id.
        listener.post_delete(&imp).await;
        assert_eq!(outbox.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_capture_wakes_worker() {
        let outbox = Arc::new(MemoryOutbox::new());
        let notify = Arc::new(Notify::new());
        let listener = ChangeCaptureListener::new(outbox).with_notify(notify.clone());
        let imp = Implementation::new("qaoa", ProgrammingLanguage::Python)
            .with_sdk(SdkRef::new("Qiskit"))
            .with_algorithm(EntityId::new());

        listener.post_insert(&imp).await;
        // notify_one stores a permit, so this resolves immediately.
        tokio::time::timeout(std::time::Duration::from_secs(1), notify.notified())
            .await
            .unwrap();
    }
}
