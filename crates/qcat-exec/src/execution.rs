//! Execution-result lifecycle.
//!
//! The state machine:
//!
//! ```text
//!   Pending ──→ Running ──→ Succeeded(outputs)
//!      │           │
//!      │           └──→ Failed(reason)
//!      └──────────────→ Failed(reason)
//! ```
//!
//! **Invariants:**
//! - Transitions are monotonic; a result never moves backward.
//! - `Succeeded` and `Failed` are terminal and permanent.
//! - `Pending → Failed` covers requests rejected before any executor ran
//!   (no compatible executor, invalid request, cancelled before start).
//!
//! The record is owned by the caller (usually the persistence layer); the
//! invoker only populates it. [`ExecutionRecord`] publishes every change as
//! a whole value, so concurrent pollers never see a half-written result.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use qcat_model::EntityId;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{ExecError, ExecResult};
use crate::executor::OutputParameters;

/// Unique identifier for an execution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub Uuid);

impl ExecutionId {
    /// Create a new random execution ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an execution ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Accepted, not yet handed to an executor.
    Pending,
    /// An executor is working on it.
    Running,
    /// Finished with output parameters.
    Succeeded,
    /// Finished with an error description.
    Failed(String),
}

impl ExecutionStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Succeeded | ExecutionStatus::Failed(_))
    }

    /// Check if the execution completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Succeeded)
    }

    /// Get a human-readable status name.
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "Pending",
            ExecutionStatus::Running => "Running",
            ExecutionStatus::Succeeded => "Succeeded",
            ExecutionStatus::Failed(_) => "Failed",
        }
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: &ExecutionStatus) -> bool {
        matches!(
            (self, next),
            (ExecutionStatus::Pending, ExecutionStatus::Running)
                | (ExecutionStatus::Pending, ExecutionStatus::Failed(_))
                | (ExecutionStatus::Running, ExecutionStatus::Succeeded)
                | (ExecutionStatus::Running, ExecutionStatus::Failed(_))
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Failed(reason) => write!(f, "Failed: {reason}"),
            other => f.write_str(other.name()),
        }
    }
}

/// The mutable record tracking one execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: ExecutionId,
    /// Implementation being run, if the caller tracks it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<EntityId>,
    pub status: ExecutionStatus,
    /// Executor that picked the request up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
    /// Outputs, populated on success.
    #[serde(default)]
    pub output_parameters: OutputParameters,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionResult {
    /// Create a new pending result.
    pub fn new() -> Self {
        Self {
            id: ExecutionId::new(),
            implementation: None,
            status: ExecutionStatus::Pending,
            executor: None,
            output_parameters: OutputParameters::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Use a caller-owned identifier.
    pub fn with_id(mut self, id: ExecutionId) -> Self {
        self.id = id;
        self
    }

    /// Associate the result with an implementation.
    pub fn for_implementation(mut self, implementation: EntityId) -> Self {
        self.implementation = Some(implementation);
        self
    }

    /// Move to `next`, stamping timestamps.
    pub fn transition(&mut self, next: ExecutionStatus) -> ExecResult<()> {
        if !self.status.can_transition_to(&next) {
            return Err(ExecError::InvalidTransition {
                from: self.status.name().to_string(),
                to: next.name().to_string(),
            });
        }
        if matches!(next, ExecutionStatus::Running) {
            self.started_at = Some(Utc::now());
        }
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        self.status = next;
        Ok(())
    }

    /// `Pending → Running` on `executor`.
    pub fn start(&mut self, executor: &str) -> ExecResult<()> {
        self.transition(ExecutionStatus::Running)?;
        self.executor = Some(executor.to_string());
        Ok(())
    }

    /// `Running → Succeeded` with outputs.
    pub fn succeed(&mut self, outputs: OutputParameters) -> ExecResult<()> {
        self.transition(ExecutionStatus::Succeeded)?;
        self.output_parameters = outputs;
        Ok(())
    }

    /// `→ Failed` with a reason.
    pub fn fail(&mut self, reason: impl Into<String>) -> ExecResult<()> {
        self.transition(ExecutionStatus::Failed(reason.into()))
    }

    /// Failure reason, if failed.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ExecutionStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared, observable handle to an [`ExecutionResult`].
///
/// One invocation writes; any number of pollers read. Every mutation is
/// applied to a copy and published only if it succeeds.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    tx: Arc<watch::Sender<ExecutionResult>>,
}

impl ExecutionRecord {
    /// Wrap a result.
    pub fn new(result: ExecutionResult) -> Self {
        let (tx, _rx) = watch::channel(result);
        Self { tx: Arc::new(tx) }
    }

    /// Create a record around a fresh pending result.
    pub fn pending() -> Self {
        Self::new(ExecutionResult::new())
    }

    /// Identifier of the tracked result.
    pub fn id(&self) -> ExecutionId {
        self.tx.borrow().id
    }

    /// Current value.
    pub fn snapshot(&self) -> ExecutionResult {
        self.tx.borrow().clone()
    }

    /// Current status.
    pub fn status(&self) -> ExecutionStatus {
        self.tx.borrow().status.clone()
    }

    /// Receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<ExecutionResult> {
        self.tx.subscribe()
    }

    /// Apply `f` to a copy of the result; publish the copy if `f` succeeds.
    pub fn update<F>(&self, f: F) -> ExecResult<()>
    where
        F: FnOnce(&mut ExecutionResult) -> ExecResult<()>,
    {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|current| {
            let mut next = current.clone();
            match f(&mut next) {
                Ok(()) => {
                    *current = next;
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });
        outcome
    }

    pub fn start(&self, executor: &str) -> ExecResult<()> {
        self.update(|result| result.start(executor))
    }

    pub fn succeed(&self, outputs: OutputParameters) -> ExecResult<()> {
        self.update(|result| result.succeed(outputs))
    }

    pub fn fail(&self, reason: impl Into<String>) -> ExecResult<()> {
        let reason = reason.into();
        self.update(|result| result.fail(reason))
    }

    /// Wait until the result reaches a terminal state.
    pub async fn wait_terminal(&self) -> ExecutionResult {
        let mut rx = self.tx.subscribe();
        let terminal = match rx.wait_for(|result| result.status.is_terminal()).await {
            Ok(result) => result.clone(),
            // Unreachable while `self` holds the sender.
            Err(_) => self.snapshot(),
        };
        terminal
    }
}
