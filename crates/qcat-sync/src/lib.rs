//! qcat knowledge-base synchronization
//!
//! Keeps a logic-programming fact base consistent with the relational
//! catalog. Persistence lifecycle events for implementations and QPUs are
//! captured into a durable outbox and delivered to the fact base by a
//! background worker with retry and backoff. A reconciler rebuilds the fact
//! base from a catalog snapshot when events were lost.
//!
//! # Overview
//!
//! - [`ChangeCaptureListener`]: post-insert/update/delete hooks. Forwards
//!   implementations and QPUs, ignores every other entity kind.
//! - [`Outbox`]: queue of [`FactMutation`]s ([`MemoryOutbox`],
//!   [`SqliteOutbox`]).
//! - [`SyncWorker`]: drains the outbox through a [`FactStoreAdapter`] into a
//!   [`FactBase`] ([`InMemoryFactBase`], [`PrologFileFactBase`]).
//! - [`Reconciler`]: full resync from a [`CatalogSnapshot`](qcat_model::CatalogSnapshot).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qcat_sync::{
//!     ChangeCaptureListener, FactStoreAdapter, PersistenceListener, PrologFileFactBase,
//!     SqliteOutbox, SyncConfig, SyncWorker,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! let outbox = Arc::new(SqliteOutbox::new("outbox.db")?);
//! let facts = Arc::new(PrologFileFactBase::new("facts").await?);
//!
//! let worker = Arc::new(SyncWorker::new(
//!     outbox.clone(),
//!     FactStoreAdapter::new(facts),
//!     SyncConfig::default(),
//! ));
//! let listener = ChangeCaptureListener::new(outbox).with_notify(worker.notifier());
//! let handle = worker.clone().start(CancellationToken::new());
//!
//! // Called by the persistence layer after a commit.
//! listener.post_insert(&qpu).await;
//! ```

pub mod adapter;
pub mod error;
pub mod fact;
pub mod factbase;
pub mod listener;
pub mod outbox;
pub mod reconcile;
pub mod worker;

pub use adapter::FactStoreAdapter;
pub use error::{SyncError, SyncResult};
pub use fact::{
    Fact, FactKey, FactKind, FactMutation, ImplementationFact, QpuFact, ToFact, fact_kind_of,
};
pub use factbase::{FactBase, InMemoryFactBase, PrologFileFactBase};
pub use listener::{ChangeCaptureListener, LifecyclePhase, PersistenceListener};
pub use outbox::{MemoryOutbox, Outbox, OutboxEntry, SqliteOutbox};
pub use reconcile::{ReconcileReport, Reconciler, SkippedEntity};
pub use worker::{DrainReport, SyncConfig, SyncWorker};
