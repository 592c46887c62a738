//! Fact-base backends.

mod memory;
mod prolog;

pub use memory::InMemoryFactBase;
pub use prolog::PrologFileFactBase;

use async_trait::async_trait;
use qcat_model::EntityId;

use crate::error::SyncResult;
use crate::fact::{FactKind, ImplementationFact, QpuFact};

/// A logic-programming knowledge base holding one fact record per
/// implementation and per QPU.
///
/// Every operation is idempotent: asserting an existing record replaces it,
/// updating a missing record creates it, retracting a missing record succeeds.
#[async_trait]
pub trait FactBase: Send + Sync {
    /// Insert the record for an implementation.
    async fn assert_implementation(&self, fact: &ImplementationFact) -> SyncResult<()>;

    /// Replace the record for an implementation.
    async fn update_implementation(&self, fact: &ImplementationFact) -> SyncResult<()>;

    /// Remove the record for an implementation.
    async fn retract_implementation(&self, id: EntityId) -> SyncResult<()>;

    /// Insert the record for a QPU.
    async fn assert_qpu(&self, fact: &QpuFact) -> SyncResult<()>;

    /// Replace the record for a QPU.
    async fn update_qpu(&self, fact: &QpuFact) -> SyncResult<()>;

    /// Remove the record for a QPU.
    async fn retract_qpu(&self, id: EntityId) -> SyncResult<()>;

    /// Identifiers of every record of the given kind, sorted.
    async fn fact_ids(&self, kind: FactKind) -> SyncResult<Vec<EntityId>>;
}
