//! qcat catalog model
//!
//! The slice of the quantum-algorithm catalog that the dispatch and
//! knowledge-base synchronization core cares about. The catalog itself
//! (schema, repositories, REST surface) lives elsewhere; these types are the
//! data it hands over.
//!
//! # Overview
//!
//! - [`EntityId`] and [`Identifiable`]: the identity capability every
//!   persisted entity exposes.
//! - [`CatalogEntity`]: what the persistence layer passes to lifecycle hooks.
//! - [`SyncEntity`]: the closed set of entity kinds mirrored into the fact
//!   base ([`Implementation`] and [`Qpu`]).
//! - [`ProgrammingLanguage`]: the language tag used as a dispatch key.
//!
//! # Example
//!
//! ```
//! use qcat_model::{CatalogEntity, EntityKind, Qpu, SdkRef, SyncEntity};
//!
//! let qpu = Qpu::new("ibmq_5_yorktown", 5)
//!     .with_sdk(SdkRef::new("Qiskit"))
//!     .with_t1(50.0)
//!     .with_max_gate_time(200.0);
//!
//! assert_eq!(qpu.kind(), EntityKind::Qpu);
//! assert!(matches!(qpu.as_synchronizable(), Some(SyncEntity::Qpu(_))));
//! ```

pub mod entity;
pub mod id;
pub mod language;

pub use entity::{
    Algorithm, AlgorithmRef, CatalogEntity, CatalogSnapshot, EntityKind, Implementation, Provider,
    Qpu, Sdk, SdkRef, SyncEntity,
};
pub use id::{EntityId, Identifiable};
pub use language::{ParseLanguageError, ProgrammingLanguage};
