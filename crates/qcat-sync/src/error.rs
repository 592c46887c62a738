//! Error handling for knowledge-base synchronization.

use qcat_model::{EntityId, EntityKind};
use thiserror::Error;

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during synchronization.
#[derive(Error, Debug)]
pub enum SyncError {
    /// An entity could not be projected into a fact.
    #[error("Cannot translate {kind} {id} into a fact: {reason}")]
    Translation {
        kind: EntityKind,
        id: EntityId,
        reason: String,
    },

    /// The fact base could not be reached.
    #[error("Fact base unavailable: {0}")]
    FactBaseUnavailable(String),

    /// The fact base rejected an operation.
    #[error("Fact base error: {0}")]
    FactBase(String),

    /// Outbox entry not found.
    #[error("Outbox entry not found: {0}")]
    EntryNotFound(u64),

    /// SQLite database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SyncError {
    /// Build a translation error.
    pub fn translation(kind: EntityKind, id: EntityId, reason: impl Into<String>) -> Self {
        SyncError::Translation {
            kind,
            id,
            reason: reason.into(),
        }
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::FactBaseUnavailable(_) | SyncError::IoError(_) | SyncError::DatabaseError(_)
        )
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        SyncError::DatabaseError(e.to_string())
    }
}
