//! Error types for the execution crate.

use thiserror::Error;

/// Errors that can occur while dispatching or running an execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecError {
    /// No registered executor supports the requested language and SDK.
    #[error("No compatible executor for language {language} and SDK {sdk}")]
    NoCompatibleExecutor { language: String, sdk: String },

    /// The implementation to run has no SDK set.
    #[error("Missing SDK: {0}")]
    MissingSdk(String),

    /// The execution request is malformed.
    #[error("Invalid execution request: {0}")]
    InvalidRequest(String),

    /// The executor ran and reported a failure.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The executor could not be started.
    #[error("Executor unavailable: {0}")]
    ExecutorUnavailable(String),

    /// The execution was cancelled.
    #[error("Execution cancelled")]
    Cancelled,

    /// The execution exceeded its time limit.
    #[error("Execution timed out after {0}s")]
    Timeout(u64),

    /// An execution result was asked to move to a state it cannot reach.
    #[error("Invalid execution state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
