//! Full resynchronization of the fact base from a catalog snapshot.
//!
//! Used to recover from lost change events or a fact base restored from an
//! old backup. The reconciler only enqueues mutations; delivery goes through
//! the same outbox and worker as live change capture, so ordering with
//! concurrent edits is preserved.

use std::sync::Arc;

use qcat_model::{CatalogSnapshot, EntityId, EntityKind};
use rustc_hash::FxHashSet;
use serde::Serialize;
use tokio::sync::Notify;

use crate::error::SyncResult;
use crate::fact::{FactKey, FactKind, FactMutation, ToFact, fact_kind_of};
use crate::factbase::FactBase;
use crate::outbox::Outbox;

/// An entity that could not be projected during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntity {
    pub kind: EntityKind,
    pub id: EntityId,
    pub reason: String,
}

/// Summary of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Update mutations enqueued for entities in the snapshot.
    pub updated: usize,
    /// Retract mutations enqueued for facts with no entity.
    pub retracted: usize,
    /// Entities left untouched because they cannot be translated.
    pub skipped: Vec<SkippedEntity>,
}

impl ReconcileReport {
    /// Total mutations enqueued.
    pub fn enqueued(&self) -> usize {
        self.updated + self.retracted
    }
}

/// Rebuilds fact-base state from the relational source of truth.
pub struct Reconciler {
    outbox: Arc<dyn Outbox>,
    fact_base: Arc<dyn FactBase>,
    notify: Option<Arc<Notify>>,
}

impl Reconciler {
    pub fn new(outbox: Arc<dyn Outbox>, fact_base: Arc<dyn FactBase>) -> Self {
        Self {
            outbox,
            fact_base,
            notify: None,
        }
    }

    pub fn with_notify(mut self, notify: Arc<Notify>) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Enqueue an update for every entity in `snapshot` and a retract for
    /// every fact, stored or still queued, whose entity is absent from it.
    ///
    /// Entities that fail translation are reported and keep whatever fact
    /// they currently have.
    pub async fn reconcile(&self, snapshot: &CatalogSnapshot) -> SyncResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let mut present: FxHashSet<FactKey> = FxHashSet::default();

        for entity in snapshot.entities() {
            present.insert((fact_kind_of(&entity), entity.id()));

            match entity.to_fact() {
                Ok(fact) => {
                    self.outbox.enqueue(FactMutation::update(fact)).await?;
                    report.updated += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping {} {}: {}", entity.kind(), entity.id(), e);
                    report.skipped.push(SkippedEntity {
                        kind: entity.kind(),
                        id: entity.id(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Orphans are stored facts plus keys still queued for delivery. A
        // queued assert for a deleted entity would otherwise land after this
        // pass and outlive it.
        let mut orphans: Vec<FactKey> = Vec::new();
        let mut seen: FxHashSet<FactKey> = FxHashSet::default();
        for kind in [FactKind::Implementation, FactKind::Qpu] {
            for id in self.fact_base.fact_ids(kind).await? {
                orphans.push((kind, id));
            }
        }
        for entry in self.outbox.pending(usize::MAX).await? {
            orphans.push(entry.key());
        }

        for (kind, id) in orphans {
            if present.contains(&(kind, id)) || !seen.insert((kind, id)) {
                continue;
            }
            self.outbox.enqueue(FactMutation::retract(kind, id)).await?;
            report.retracted += 1;
        }

        tracing::info!(
            updated = report.updated,
            retracted = report.retracted,
            skipped = report.skipped.len(),
            "Reconciliation enqueued"
        );

        if let Some(notify) = &self.notify {
            if report.enqueued() > 0 {
                notify.notify_one();
            }
        }
        Ok(report)
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FactStoreAdapter;
    use crate::factbase::InMemoryFactBase;
    use crate::listener::{ChangeCaptureListener, PersistenceListener};
    use crate::outbox::MemoryOutbox;
    use crate::worker::{SyncConfig, SyncWorker};
    use qcat_model::{Implementation, ProgrammingLanguage, Qpu, SdkRef, SyncEntity};

    #[tokio::test]
    async fn test_reconcile_restores_and_prunes() {
        let outbox = Arc::new(MemoryOutbox::new());
        let base = Arc::new(InMemoryFactBase::new());
        let adapter = FactStoreAdapter::new(base.clone());

        // A stale fact whose entity no longer exists.
        let gone = Qpu::new("decommissioned", 2);
        adapter.insert(SyncEntity::Qpu(&gone)).await.unwrap();

        let kept = Qpu::new("aspen-4", 16).with_sdk(SdkRef::new("Forest"));
        let imp = Implementation::new("grover", ProgrammingLanguage::Python)
            .with_sdk(SdkRef::new("Forest"))
            .with_algorithm(EntityId::new());
        let broken = Implementation::new("draft", ProgrammingLanguage::Python);
        let snapshot = CatalogSnapshot {
            implementations: vec![imp.clone(), broken.clone()],
            qpus: vec![kept.clone()],
        };

        let report = Reconciler::new(outbox.clone(), base.clone())
            .reconcile(&snapshot)
            .await
            .unwrap();
        assert_eq!(report.updated, 2);
        assert_eq!(report.retracted, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id, broken.id);

        let worker = SyncWorker::new(outbox, adapter, SyncConfig::default());
        worker.run_until_idle().await.unwrap();

        assert!(base.get_qpu(gone.id).await.is_none());
        assert!(base.get_qpu(kept.id).await.is_some());
        assert!(base.get_implementation(imp.id).await.is_some());
        assert!(base.get_implementation(broken.id).await.is_none());
    }

    #[tokio::test]
    async fn test_reconcile_retracts_queued_assert_for_deleted_entity() {
        let outbox = Arc::new(MemoryOutbox::new());
        let base = Arc::new(InMemoryFactBase::new());
        let listener = ChangeCaptureListener::new(outbox.clone());

        // Captured while the fact base was down, then the row was removed
        // without a delete event reaching the listener.
        let qpu = Qpu::new("ibmq-lima", 5).with_sdk(SdkRef::new("Qiskit"));
        listener.post_insert(&qpu).await;
        assert_eq!(outbox.len().await.unwrap(), 1);
        assert!(base.get_qpu(qpu.id).await.is_none());

        let report = Reconciler::new(outbox.clone(), base.clone())
            .reconcile(&CatalogSnapshot::new())
            .await
            .unwrap();
        assert_eq!(report.retracted, 1);

        let worker = SyncWorker::new(
            outbox.clone(),
            FactStoreAdapter::new(base.clone()),
            SyncConfig::default(),
        );
        worker.run_until_idle().await.unwrap();

        assert!(base.get_qpu(qpu.id).await.is_none());
        assert!(base.is_empty().await);
        assert!(outbox.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_reconcile_retracts_each_orphan_once() {
        let outbox = Arc::new(MemoryOutbox::new());
        let base = Arc::new(InMemoryFactBase::new());
        let listener = ChangeCaptureListener::new(outbox.clone());

        let qpu = Qpu::new("aspen-4", 16);
        FactStoreAdapter::new(base.clone())
            .insert(SyncEntity::Qpu(&qpu))
            .await
            .unwrap();
        listener.post_update(&qpu).await;

        let report = Reconciler::new(outbox.clone(), base.clone())
            .reconcile(&CatalogSnapshot::new())
            .await
            .unwrap();
        assert_eq!(report.retracted, 1);
        assert_eq!(outbox.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_empty_snapshot_retracts_everything() {
        let outbox = Arc::new(MemoryOutbox::new());
        let base = Arc::new(InMemoryFactBase::new());
        let adapter = FactStoreAdapter::new(base.clone());
        for n in 0..3 {
            adapter
                .insert(SyncEntity::Qpu(&Qpu::new(format!("q{n}"), n)))
                .await
                .unwrap();
        }

        let report = Reconciler::new(outbox.clone(), base.clone())
            .reconcile(&CatalogSnapshot::new())
            .await
            .unwrap();
        assert_eq!(report.retracted, 3);
        assert_eq!(outbox.len().await.unwrap(), 3);
    }
}
