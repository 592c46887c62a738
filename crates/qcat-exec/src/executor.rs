//! Executor plugin interface.
//!
//! An [`Executor`] runs algorithm implementations for a declared set of
//! programming languages and SDKs:
//!
//! ```text
//!   capabilities() ──→ registry.select() ──→ execute()
//!    (sync, &ref)          (sync)             (async)
//! ```
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `capabilities()` | sync | yes | `&ExecutorCapabilities` |
//! | `supported_languages()` | sync | provided | `&BTreeSet<ProgrammingLanguage>` |
//! | `supported_sdks()` | sync | provided | `&BTreeSet<String>` |
//! | `execute()` | async | yes | `ExecResult<OutputParameters>` |

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use qcat_model::ProgrammingLanguage;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::capability::ExecutorCapabilities;
use crate::error::{ExecError, ExecResult};

/// Input parameters handed to an executor.
pub type InputParameters = BTreeMap<String, String>;

/// Output parameters produced by an executor.
pub type OutputParameters = BTreeMap<String, String>;

/// Hardware an execution is aimed at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTarget {
    /// Provider operating the QPU, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// QPU name.
    pub qpu: String,
}

impl ExecutionTarget {
    pub fn new(qpu: impl Into<String>) -> Self {
        Self {
            provider: None,
            qpu: qpu.into(),
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

/// A fully-resolved request to run an implementation artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Location of the runnable artifact.
    pub artifact_location: String,
    /// Target hardware.
    pub target: ExecutionTarget,
    /// Input parameters.
    #[serde(default)]
    pub input_parameters: InputParameters,
}

impl ExecutionRequest {
    pub fn new(artifact_location: impl Into<String>, target: ExecutionTarget) -> Self {
        Self {
            artifact_location: artifact_location.into(),
            target,
            input_parameters: InputParameters::new(),
        }
    }

    /// Add an input parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.input_parameters.insert(key.into(), value.into());
        self
    }

    /// Check the request before it reaches an executor.
    pub fn validate(&self) -> ExecResult<()> {
        if self.artifact_location.trim().is_empty() {
            return Err(ExecError::InvalidRequest(
                "artifact location is empty".into(),
            ));
        }
        if self.target.qpu.trim().is_empty() {
            return Err(ExecError::InvalidRequest("target QPU is empty".into()));
        }
        Ok(())
    }
}

/// Trait for executor plugins.
///
/// # Contract
///
/// - `capabilities()` MUST be synchronous and infallible; capabilities are
///   fixed at construction.
/// - `execute()` MAY run for a long time. It SHOULD return promptly with
///   [`ExecError::Cancelled`] once `cancel` fires.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Name of this executor.
    fn name(&self) -> &str;

    /// Languages and SDKs this executor can run.
    fn capabilities(&self) -> &ExecutorCapabilities;

    /// Supported programming languages.
    fn supported_languages(&self) -> &BTreeSet<ProgrammingLanguage> {
        &self.capabilities().languages
    }

    /// Supported SDK names.
    fn supported_sdks(&self) -> &BTreeSet<String> {
        &self.capabilities().sdks
    }

    /// Run the artifact described by `request` and return its outputs.
    async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: CancellationToken,
    ) -> ExecResult<OutputParameters>;
}
