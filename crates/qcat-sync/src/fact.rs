//! Fact records and fact-base mutations.
//!
//! A fact record is the fact-base representation of one catalog entity,
//! keyed by the entity's identifier. It is always written whole: insert,
//! replace, or remove, never patched.

use qcat_model::{EntityId, EntityKind, Implementation, Qpu, SyncEntity};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Kind of fact record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Implementation,
    Qpu,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::Implementation => "implementation",
            FactKind::Qpu => "qpu",
        }
    }

    /// Entity kind this fact mirrors.
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            FactKind::Implementation => EntityKind::Implementation,
            FactKind::Qpu => EntityKind::Qpu,
        }
    }
}

impl std::fmt::Display for FactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fact-base key: one record per (kind, identifier).
pub type FactKey = (FactKind, EntityId);

/// Fact record for an implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationFact {
    pub id: EntityId,
    pub sdk_name: String,
    pub algorithm_id: EntityId,
    /// Forwarded verbatim.
    pub selection_rule: String,
}

impl ImplementationFact {
    /// Project an implementation. Fails if the SDK or algorithm is unset.
    pub fn from_implementation(implementation: &Implementation) -> SyncResult<Self> {
        let fail =
            |reason: &str| SyncError::translation(EntityKind::Implementation, implementation.id, reason);

        let sdk = implementation
            .sdk
            .as_ref()
            .ok_or_else(|| fail("sdk is not set"))?;
        if sdk.name.trim().is_empty() {
            return Err(fail("sdk name is empty"));
        }
        let algorithm = implementation
            .implemented_algorithm
            .ok_or_else(|| fail("implemented algorithm is not set"))?;

        Ok(Self {
            id: implementation.id,
            sdk_name: sdk.name.clone(),
            algorithm_id: algorithm.id,
            selection_rule: implementation.selection_rule.clone(),
        })
    }
}

/// Fact record for a QPU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QpuFact {
    pub id: EntityId,
    pub qubit_count: u32,
    /// Supported SDK names, in the order the QPU holds them.
    pub sdk_names: Vec<String>,
    pub t1: f64,
    pub max_gate_time: f64,
}

impl QpuFact {
    /// Project a QPU. Fails on negative or non-finite hardware metrics.
    pub fn from_qpu(qpu: &Qpu) -> SyncResult<Self> {
        for (name, value) in [("t1", qpu.t1), ("max gate time", qpu.max_gate_time)] {
            if !value.is_finite() || value < 0.0 {
                return Err(SyncError::translation(
                    EntityKind::Qpu,
                    qpu.id,
                    format!("{name} must be a non-negative number, got {value}"),
                ));
            }
        }

        Ok(Self {
            id: qpu.id,
            qubit_count: qpu.qubit_count,
            sdk_names: qpu.sdk_names(),
            t1: qpu.t1,
            max_gate_time: qpu.max_gate_time,
        })
    }
}

/// A complete fact record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fact {
    Implementation(ImplementationFact),
    Qpu(QpuFact),
}

impl Fact {
    pub fn id(&self) -> EntityId {
        match self {
            Fact::Implementation(fact) => fact.id,
            Fact::Qpu(fact) => fact.id,
        }
    }

    pub fn kind(&self) -> FactKind {
        match self {
            Fact::Implementation(_) => FactKind::Implementation,
            Fact::Qpu(_) => FactKind::Qpu,
        }
    }

    pub fn key(&self) -> FactKey {
        (self.kind(), self.id())
    }
}

/// Projection of a synchronizable entity into its fact record.
pub trait ToFact {
    fn to_fact(&self) -> SyncResult<Fact>;
}

impl ToFact for Implementation {
    fn to_fact(&self) -> SyncResult<Fact> {
        ImplementationFact::from_implementation(self).map(Fact::Implementation)
    }
}

impl ToFact for Qpu {
    fn to_fact(&self) -> SyncResult<Fact> {
        QpuFact::from_qpu(self).map(Fact::Qpu)
    }
}

impl ToFact for SyncEntity<'_> {
    fn to_fact(&self) -> SyncResult<Fact> {
        match self {
            SyncEntity::Implementation(implementation) => implementation.to_fact(),
            SyncEntity::Qpu(qpu) => qpu.to_fact(),
        }
    }
}

/// Fact kind of a synchronizable entity.
pub fn fact_kind_of(entity: &SyncEntity<'_>) -> FactKind {
    match entity {
        SyncEntity::Implementation(_) => FactKind::Implementation,
        SyncEntity::Qpu(_) => FactKind::Qpu,
    }
}

/// One mutation of the fact base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FactMutation {
    /// Insert a record (equivalent to replace if it already exists).
    Assert { fact: Fact },
    /// Replace a record.
    Update { fact: Fact },
    /// Remove a record (no-op if absent).
    Retract { kind: FactKind, id: EntityId },
}

impl FactMutation {
    pub fn assert(fact: Fact) -> Self {
        FactMutation::Assert { fact }
    }

    pub fn update(fact: Fact) -> Self {
        FactMutation::Update { fact }
    }

    pub fn retract(kind: FactKind, id: EntityId) -> Self {
        FactMutation::Retract { kind, id }
    }

    /// Record this mutation targets.
    pub fn key(&self) -> FactKey {
        match self {
            FactMutation::Assert { fact } | FactMutation::Update { fact } => fact.key(),
            FactMutation::Retract { kind, id } => (*kind, *id),
        }
    }

    /// Short operation name.
    pub fn op(&self) -> &'static str {
        match self {
            FactMutation::Assert { .. } => "assert",
            FactMutation::Update { .. } => "update",
            FactMutation::Retract { .. } => "retract",
        }
    }
}

impl std::fmt::Display for FactMutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (kind, id) = self.key();
        write!(f, "{} {} {}", self.op(), kind, id)
    }
}
