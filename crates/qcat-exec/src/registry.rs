//! Executor registry and dispatch selection.
//!
//! The [`ExecutorRegistry`] keeps executors in registration order. Dispatch
//! picks the first executor whose capabilities cover both the
//! implementation's language and its SDK; order is the only tie-break.

use std::sync::Arc;

use qcat_model::{Implementation, ProgrammingLanguage};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{ExecError, ExecResult};
use crate::executor::Executor;

/// Ordered, append-only registry of executor plugins.
///
/// Built once at startup and then shared behind an `Arc`; reads need no
/// locking.
pub struct ExecutorRegistry {
    executors: Vec<Arc<dyn Executor>>,
    /// Position of the first executor registered under each name.
    by_name: FxHashMap<String, usize>,
}

impl ExecutorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            executors: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }

    /// Append an executor.
    pub fn register(&mut self, executor: Arc<dyn Executor>) -> &mut Self {
        let name = executor.name().to_string();
        debug!(
            "Registering executor: {} (languages={:?}, sdks={:?})",
            name,
            executor.supported_languages(),
            executor.supported_sdks()
        );
        if self.by_name.contains_key(&name) {
            warn!("Executor name '{}' registered twice; lookups by name return the first", name);
        } else {
            self.by_name.insert(name, self.executors.len());
        }
        self.executors.push(executor);
        self
    }

    /// Builder-style registration.
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.register(executor);
        self
    }

    /// All registered executors in registration order.
    pub fn executors(&self) -> &[Arc<dyn Executor>] {
        &self.executors
    }

    /// Executor names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.executors
            .iter()
            .map(|executor| executor.name().to_string())
            .collect()
    }

    /// Look up an executor by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Executor>> {
        self.by_name
            .get(name)
            .map(|&idx| Arc::clone(&self.executors[idx]))
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    /// Select the first executor supporting `language` and `sdk`.
    ///
    /// A missing SDK is reported as [`ExecError::MissingSdk`]; no match as
    /// [`ExecError::NoCompatibleExecutor`] naming both keys.
    pub fn select(
        &self,
        language: ProgrammingLanguage,
        sdk: Option<&str>,
    ) -> ExecResult<Arc<dyn Executor>> {
        let Some(sdk) = sdk else {
            return Err(ExecError::MissingSdk(format!(
                "cannot dispatch a {language} implementation without an SDK"
            )));
        };

        let selected = self
            .executors
            .iter()
            .find(|executor| executor.capabilities().supports(language, sdk))
            .cloned();

        match selected {
            Some(executor) => {
                debug!(
                    "Selected executor {} for ({}, {})",
                    executor.name(),
                    language,
                    sdk
                );
                Ok(executor)
            }
            None => Err(ExecError::NoCompatibleExecutor {
                language: language.to_string(),
                sdk: sdk.to_string(),
            }),
        }
    }

    /// Select an executor for an implementation.
    pub fn select_for(&self, implementation: &Implementation) -> ExecResult<Arc<dyn Executor>> {
        if implementation.sdk.is_none() {
            return Err(ExecError::MissingSdk(format!(
                "implementation {} ({}) has no SDK",
                implementation.name, implementation.id
            )));
        }
        self.select(
            implementation.programming_language,
            implementation.sdk_name(),
        )
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("executors", &self.names())
            .finish()
    }
}
