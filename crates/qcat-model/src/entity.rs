//! Catalog entities handed to the core by the persistence layer.
//!
//! Only the fields the core reads are modelled. References to other entities
//! are optional because the persistence layer may hand over an entity whose
//! relations were never set; consumers decide whether that is an error.

use serde::{Deserialize, Serialize};

use crate::id::{EntityId, Identifiable};
use crate::language::ProgrammingLanguage;

/// Kind of a catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Algorithm,
    Implementation,
    Provider,
    Qpu,
    Sdk,
}

impl EntityKind {
    /// Lowercase name used in logs and storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Algorithm => "algorithm",
            EntityKind::Implementation => "implementation",
            EntityKind::Provider => "provider",
            EntityKind::Qpu => "qpu",
            EntityKind::Sdk => "sdk",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted catalog entity, as seen by lifecycle hooks.
pub trait CatalogEntity: Identifiable + Send + Sync {
    /// Concrete kind of this entity.
    fn kind(&self) -> EntityKind;

    /// View this entity as one of the kinds mirrored into the fact base.
    ///
    /// Returns `None` for every kind that has no fact representation.
    fn as_synchronizable(&self) -> Option<SyncEntity<'_>> {
        None
    }
}

/// The closed set of entity kinds mirrored into the fact base.
#[derive(Debug, Clone, Copy)]
pub enum SyncEntity<'a> {
    Implementation(&'a Implementation),
    Qpu(&'a Qpu),
}

impl SyncEntity<'_> {
    /// Identifier of the wrapped entity.
    pub fn id(&self) -> EntityId {
        match self {
            SyncEntity::Implementation(imp) => imp.id,
            SyncEntity::Qpu(qpu) => qpu.id,
        }
    }

    /// Kind of the wrapped entity.
    pub fn kind(&self) -> EntityKind {
        match self {
            SyncEntity::Implementation(_) => EntityKind::Implementation,
            SyncEntity::Qpu(_) => EntityKind::Qpu,
        }
    }
}

/// Reference to an SDK by identifier and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkRef {
    pub id: EntityId,
    pub name: String,
}

impl SdkRef {
    /// Reference a new SDK with a fresh identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
        }
    }
}

/// Reference to an algorithm by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmRef {
    pub id: EntityId,
}

impl AlgorithmRef {
    pub fn new(id: EntityId) -> Self {
        Self { id }
    }
}

/// An SDK record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sdk {
    pub id: EntityId,
    pub name: String,
}

impl Sdk {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
        }
    }

    /// Reference to this SDK.
    pub fn to_ref(&self) -> SdkRef {
        SdkRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// An algorithm record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithm {
    pub id: EntityId,
    pub name: String,
}

impl Algorithm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
        }
    }
}

/// A provider record (cloud vendor operating QPUs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: EntityId,
    pub name: String,
}

impl Provider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
        }
    }
}

/// A concrete implementation of an algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub id: EntityId,
    pub name: String,
    /// Algorithm this implementation realises.
    #[serde(default)]
    pub implemented_algorithm: Option<AlgorithmRef>,
    /// SDK the implementation depends on. Required before synchronization.
    #[serde(default)]
    pub sdk: Option<SdkRef>,
    pub programming_language: ProgrammingLanguage,
    /// Selection rule, opaque to this crate and forwarded verbatim.
    #[serde(default)]
    pub selection_rule: String,
    /// Location of the runnable artifact.
    #[serde(default)]
    pub file_location: Option<String>,
}

impl Implementation {
    /// Create an implementation with no algorithm or SDK set.
    pub fn new(name: impl Into<String>, programming_language: ProgrammingLanguage) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            implemented_algorithm: None,
            sdk: None,
            programming_language,
            selection_rule: String::new(),
            file_location: None,
        }
    }

    /// Use a fixed identifier.
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    /// Set the implemented algorithm.
    pub fn with_algorithm(mut self, algorithm_id: EntityId) -> Self {
        self.implemented_algorithm = Some(AlgorithmRef::new(algorithm_id));
        self
    }

    /// Set the SDK.
    pub fn with_sdk(mut self, sdk: SdkRef) -> Self {
        self.sdk = Some(sdk);
        self
    }

    /// Set the selection rule.
    pub fn with_selection_rule(mut self, rule: impl Into<String>) -> Self {
        self.selection_rule = rule.into();
        self
    }

    /// Set the artifact location.
    pub fn with_file_location(mut self, location: impl Into<String>) -> Self {
        self.file_location = Some(location.into());
        self
    }

    /// Name of the SDK, if set.
    pub fn sdk_name(&self) -> Option<&str> {
        self.sdk.as_ref().map(|sdk| sdk.name.as_str())
    }
}

/// A quantum processing unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qpu {
    pub id: EntityId,
    pub name: String,
    pub qubit_count: u32,
    /// SDKs able to target this QPU.
    #[serde(default)]
    pub supported_sdks: Vec<SdkRef>,
    /// T1 relaxation time.
    #[serde(default)]
    pub t1: f64,
    /// Maximum gate time.
    #[serde(default)]
    pub max_gate_time: f64,
}

impl Qpu {
    pub fn new(name: impl Into<String>, qubit_count: u32) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            qubit_count,
            supported_sdks: Vec::new(),
            t1: 0.0,
            max_gate_time: 0.0,
        }
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    pub fn with_sdk(mut self, sdk: SdkRef) -> Self {
        self.supported_sdks.push(sdk);
        self
    }

    pub fn with_t1(mut self, t1: f64) -> Self {
        self.t1 = t1;
        self
    }

    pub fn with_max_gate_time(mut self, max_gate_time: f64) -> Self {
        self.max_gate_time = max_gate_time;
        self
    }

    /// Names of the supported SDKs, in the order they are held.
    pub fn sdk_names(&self) -> Vec<String> {
        self.supported_sdks.iter().map(|sdk| sdk.name.clone()).collect()
    }
}

macro_rules! identifiable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identifiable for $ty {
                fn id(&self) -> EntityId {
                    self.id
                }
            }
        )*
    };
}

identifiable!(Algorithm, Implementation, Provider, Qpu, Sdk);

impl CatalogEntity for Algorithm {
    fn kind(&self) -> EntityKind {
        EntityKind::Algorithm
    }
}

impl CatalogEntity for Provider {
    fn kind(&self) -> EntityKind {
        EntityKind::Provider
    }
}

impl CatalogEntity for Sdk {
    fn kind(&self) -> EntityKind {
        EntityKind::Sdk
    }
}

impl CatalogEntity for Implementation {
    fn kind(&self) -> EntityKind {
        EntityKind::Implementation
    }

    fn as_synchronizable(&self) -> Option<SyncEntity<'_>> {
        Some(SyncEntity::Implementation(self))
    }
}

impl CatalogEntity for Qpu {
    fn kind(&self) -> EntityKind {
        EntityKind::Qpu
    }

    fn as_synchronizable(&self) -> Option<SyncEntity<'_>> {
        Some(SyncEntity::Qpu(self))
    }
}

/// Point-in-time copy of the synchronizable part of the catalog.
///
/// Used to rebuild the fact base from the relational source of truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub implementations: Vec<Implementation>,
    #[serde(default)]
    pub qpus: Vec<Qpu>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// All synchronizable entities: implementations first, then QPUs.
    pub fn entities(&self) -> impl Iterator<Item = SyncEntity<'_>> {
        self.implementations
            .iter()
            .map(SyncEntity::Implementation)
            .chain(self.qpus.iter().map(SyncEntity::Qpu))
    }

    /// Number of entities in the snapshot.
    pub fn len(&self) -> usize {
        self.implementations.len() + self.qpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
