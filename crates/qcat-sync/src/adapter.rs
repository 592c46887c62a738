//! Adapter between catalog entities and the fact base.

use std::sync::Arc;

use qcat_model::SyncEntity;

use crate::error::SyncResult;
use crate::fact::{Fact, FactKind, FactMutation, ToFact, fact_kind_of};
use crate::factbase::FactBase;

/// Projects synchronizable entities into fact records and applies the
/// resulting mutations to a [`FactBase`].
#[derive(Clone)]
pub struct FactStoreAdapter {
    fact_base: Arc<dyn FactBase>,
}

impl FactStoreAdapter {
    pub fn new(fact_base: Arc<dyn FactBase>) -> Self {
        Self { fact_base }
    }

    pub fn fact_base(&self) -> &Arc<dyn FactBase> {
        &self.fact_base
    }

    /// Apply one mutation.
    pub async fn apply(&self, mutation: &FactMutation) -> SyncResult<()> {
        tracing::debug!(mutation = %mutation, "Applying fact mutation");

        match mutation {
            FactMutation::Assert { fact } => match fact {
                Fact::Implementation(f) => self.fact_base.assert_implementation(f).await,
                Fact::Qpu(f) => self.fact_base.assert_qpu(f).await,
            },
            FactMutation::Update { fact } => match fact {
                Fact::Implementation(f) => self.fact_base.update_implementation(f).await,
                Fact::Qpu(f) => self.fact_base.update_qpu(f).await,
            },
            FactMutation::Retract { kind, id } => match kind {
                FactKind::Implementation => self.fact_base.retract_implementation(*id).await,
                FactKind::Qpu => self.fact_base.retract_qpu(*id).await,
            },
        }
    }

    /// Assert the record for a newly persisted entity.
    pub async fn insert(&self, entity: SyncEntity<'_>) -> SyncResult<()> {
        let fact = entity.to_fact()?;
        self.apply(&FactMutation::assert(fact)).await
    }

    /// Replace the record for a modified entity.
    pub async fn update(&self, entity: SyncEntity<'_>) -> SyncResult<()> {
        let fact = entity.to_fact()?;
        self.apply(&FactMutation::update(fact)).await
    }

    /// Retract the record for a deleted entity. Needs only the identifier.
    pub async fn delete(&self, entity: SyncEntity<'_>) -> SyncResult<()> {
        self.apply(&FactMutation::retract(fact_kind_of(&entity), entity.id()))
            .await
    }
}

impl std::fmt::Debug for FactStoreAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactStoreAdapter").finish_non_exhaustive()
    }
}
