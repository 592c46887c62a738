//! Execution invoker.
//!
//! Runs a selected executor against a request and drives the caller's
//! [`ExecutionRecord`] through its lifecycle. Everything that can go wrong
//! once a request has been accepted (executor error, executor panic,
//! cancellation, timeout) ends as `Failed` on the record instead of escaping
//! as a fault.

use std::sync::Arc;
use std::time::Duration;

use qcat_model::Implementation;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ExecError, ExecResult};
use crate::execution::{ExecutionRecord, ExecutionResult};
use crate::executor::{ExecutionRequest, Executor, OutputParameters};
use crate::registry::ExecutorRegistry;

/// Default ceiling for a single execution (1 hour).
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Configuration for the invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokerConfig {
    /// Maximum time an executor may run before the execution is failed.
    pub timeout_secs: u64,
}

impl InvokerConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout_secs: timeout.as_secs().max(1),
        }
    }

    /// Effective timeout. Never shorter than one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// How a single invocation ended.
enum Outcome {
    Finished(ExecResult<OutputParameters>),
    Panicked(String),
    TimedOut,
    Cancelled,
}

/// Dispatches requests to executors and records their outcome.
pub struct ExecutionInvoker {
    registry: Arc<ExecutorRegistry>,
    config: InvokerConfig,
}

impl ExecutionInvoker {
    /// Create an invoker over a registry.
    pub fn new(registry: Arc<ExecutorRegistry>, config: InvokerConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Select an executor for `implementation` and run `request` on it.
    ///
    /// Selection failures are returned as `Err` and also recorded as
    /// `Failed`, so the record never stays `Pending`. Once an executor is
    /// selected the call always returns `Ok` with the terminal result.
    pub async fn dispatch(
        &self,
        implementation: &Implementation,
        request: ExecutionRequest,
        record: &ExecutionRecord,
        cancel: CancellationToken,
    ) -> ExecResult<ExecutionResult> {
        let executor = match self.registry.select_for(implementation) {
            Ok(executor) => executor,
            Err(e) => {
                warn!(
                    "Dispatch failed for implementation {}: {}",
                    implementation.id, e
                );
                if let Err(record_err) = record.fail(e.to_string()) {
                    warn!("Could not record dispatch failure on {}: {}", record.id(), record_err);
                }
                return Err(e);
            }
        };

        Ok(self.invoke(executor, request, record, cancel).await)
    }

    /// Run `request` on `executor`, returning the terminal result.
    pub async fn invoke(
        &self,
        executor: Arc<dyn Executor>,
        request: ExecutionRequest,
        record: &ExecutionRecord,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let execution_id = record.id();

        if let Err(e) = request.validate() {
            self.finish(record, Err(e.to_string()));
            return record.snapshot();
        }
        if cancel.is_cancelled() {
            self.finish(record, Err(ExecError::Cancelled.to_string()));
            return record.snapshot();
        }
        if let Err(e) = record.start(executor.name()) {
            warn!("Execution {} not started: {}", execution_id, e);
            return record.snapshot();
        }

        let name = executor.name().to_string();
        info!("Execution {} running on {}", execution_id, name);

        let executor_cancel = cancel.child_token();
        let task_cancel = executor_cancel.clone();
        let mut handle =
            tokio::spawn(async move { executor.execute(&request, task_cancel).await });
        let abort = handle.abort_handle();

        let timeout = self.config.timeout();
        let outcome = tokio::select! {
            joined = &mut handle => match joined {
                Ok(result) => Outcome::Finished(result),
                Err(e) if e.is_panic() => Outcome::Panicked(format!("executor '{name}' panicked")),
                Err(e) => Outcome::Panicked(format!("executor '{name}' task aborted: {e}")),
            },
            _ = tokio::time::sleep(timeout) => Outcome::TimedOut,
            _ = cancel.cancelled() => Outcome::Cancelled,
        };

        let finished = match outcome {
            Outcome::Finished(Ok(outputs)) => Ok(outputs),
            Outcome::Finished(Err(e)) => Err(e.to_string()),
            Outcome::Panicked(reason) => Err(reason),
            Outcome::TimedOut => {
                executor_cancel.cancel();
                abort.abort();
                Err(ExecError::Timeout(timeout.as_secs()).to_string())
            }
            Outcome::Cancelled => {
                executor_cancel.cancel();
                abort.abort();
                Err(ExecError::Cancelled.to_string())
            }
        };

        self.finish(record, finished);
        record.snapshot()
    }

    /// Run [`dispatch`](Self::dispatch) on a background task.
    ///
    /// Callers poll or subscribe to `record` for progress.
    pub fn spawn(
        self: &Arc<Self>,
        implementation: Implementation,
        request: ExecutionRequest,
        record: ExecutionRecord,
        cancel: CancellationToken,
    ) -> JoinHandle<ExecResult<ExecutionResult>> {
        let invoker = Arc::clone(self);
        tokio::spawn(async move {
            invoker
                .dispatch(&implementation, request, &record, cancel)
                .await
        })
    }

    fn finish(&self, record: &ExecutionRecord, outcome: Result<OutputParameters, String>) {
        let id = record.id();
        let published = match outcome {
            Ok(outputs) => {
                debug!("Execution {} produced {} outputs", id, outputs.len());
                record.succeed(outputs)
            }
            Err(reason) => {
                warn!("Execution {} failed: {}", id, reason);
                record.fail(reason)
            }
        };
        if let Err(e) = published {
            warn!("Execution {} already finished: {}", id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ExecutorCapabilities;
    use crate::execution::ExecutionStatus;
    use crate::executor::ExecutionTarget;
    use async_trait::async_trait;
    use qcat_model::{ProgrammingLanguage, SdkRef};

    enum Behaviour {
        Echo,
        Fail,
        Panic,
        Hang,
    }

    struct MockExecutor {
        capabilities: ExecutorCapabilities,
        behaviour: Behaviour,
    }

    impl MockExecutor {
        fn new(behaviour: Behaviour) -> Arc<dyn Executor> {
            Arc::new(Self {
                capabilities: ExecutorCapabilities::new()
                    .with_language(ProgrammingLanguage::Python)
                    .with_sdk("Qiskit"),
                behaviour,
            })
        }
    }

    #[async_trait]
    impl Executor for MockExecutor {
        fn name(&self) -> &str {
            "mock"
        }

        fn capabilities(&self) -> &ExecutorCapabilities {
            &self.capabilities
        }

        async fn execute(
            &self,
            request: &ExecutionRequest,
            cancel: CancellationToken,
        ) -> ExecResult<OutputParameters> {
            match self.behaviour {
                Behaviour::Echo => Ok(request.input_parameters.clone()),
                Behaviour::Fail => Err(ExecError::ExecutionFailed("circuit too deep".into())),
                Behaviour::Panic => panic!("executor bug"),
                Behaviour::Hang => {
                    cancel.cancelled().await;
                    Err(ExecError::Cancelled)
                }
            }
        }
    }

    fn request() -> ExecutionRequest {
        ExecutionRequest::new("file:///algo.py", ExecutionTarget::new("ibmq_qasm_simulator"))
            .with_parameter("n", "3")
    }

    fn invoker_with(executor: Arc<dyn Executor>, timeout_secs: u64) -> ExecutionInvoker {
        let registry = ExecutorRegistry::new().with_executor(executor);
        ExecutionInvoker::new(Arc::new(registry), InvokerConfig { timeout_secs })
    }

    #[tokio::test]
    async fn test_invoke_success_records_outputs() {
        let executor = MockExecutor::new(Behaviour::Echo);
        let invoker = invoker_with(Arc::clone(&executor), 60);
        let record = ExecutionRecord::pending();

        let result = invoker
            .invoke(executor, request(), &record, CancellationToken::new())
            .await;

        assert_eq!(result.status, ExecutionStatus::Succeeded);
        assert_eq!(result.output_parameters.get("n").map(String::as_str), Some("3"));
        assert_eq!(result.executor.as_deref(), Some("mock"));
        assert_eq!(record.snapshot(), result);
    }

    #[tokio::test]
    async fn test_invoke_executor_error_becomes_failed() {
        let executor = MockExecutor::new(Behaviour::Fail);
        let invoker = invoker_with(Arc::clone(&executor), 60);
        let record = ExecutionRecord::pending();

        let result = invoker
            .invoke(executor, request(), &record, CancellationToken::new())
            .await;

        assert!(result.error().unwrap().contains("circuit too deep"));
    }

    #[tokio::test]
    async fn test_invoke_panic_is_contained() {
        let executor = MockExecutor::new(Behaviour::Panic);
        let invoker = invoker_with(Arc::clone(&executor), 60);
        let record = ExecutionRecord::pending();

        let result = invoker
            .invoke(executor, request(), &record, CancellationToken::new())
            .await;

        assert!(result.error().unwrap().contains("panicked"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_timeout() {
        let executor = MockExecutor::new(Behaviour::Hang);
        let invoker = invoker_with(Arc::clone(&executor), 5);
        let record = ExecutionRecord::pending();

        let result = invoker
            .invoke(executor, request(), &record, CancellationToken::new())
            .await;

        assert_eq!(
            result.status,
            ExecutionStatus::Failed("Execution timed out after 5s".into())
        );
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let config: InvokerConfig = serde_json::from_str(r#"{"timeout_secs": 0}"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(
            InvokerConfig::with_timeout(Duration::from_millis(10)).timeout(),
            Duration::from_secs(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_with_zero_timeout_still_runs() {
        let executor = MockExecutor::new(Behaviour::Echo);
        let invoker = invoker_with(Arc::clone(&executor), 0);
        let record = ExecutionRecord::pending();

        let result = invoker
            .invoke(executor, request(), &record, CancellationToken::new())
            .await;
        assert_eq!(result.status, ExecutionStatus::Succeeded);

        let hanging = MockExecutor::new(Behaviour::Hang);
        let invoker = invoker_with(Arc::clone(&hanging), 0);
        let record = ExecutionRecord::pending();
        let result = invoker
            .invoke(hanging, request(), &record, CancellationToken::new())
            .await;
        assert_eq!(
            result.status,
            ExecutionStatus::Failed("Execution timed out after 1s".into())
        );
    }

    #[tokio::test]
    async fn test_invoke_cancellation() {
        let executor = MockExecutor::new(Behaviour::Hang);
        let invoker = invoker_with(Arc::clone(&executor), 600);
        let record = ExecutionRecord::pending();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        let mut rx = record.subscribe();
        tokio::spawn(async move {
            let _ = rx.wait_for(|r| r.status == ExecutionStatus::Running).await;
            trigger.cancel();
        });

        let result = invoker.invoke(executor, request(), &record, cancel).await;
        assert_eq!(
            result.status,
            ExecutionStatus::Failed("Execution cancelled".into())
        );
    }

    #[tokio::test]
    async fn test_invoke_already_cancelled_never_runs() {
        let executor = MockExecutor::new(Behaviour::Echo);
        let invoker = invoker_with(Arc::clone(&executor), 60);
        let record = ExecutionRecord::pending();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = invoker.invoke(executor, request(), &record, cancel).await;
        assert!(result.started_at.is_none());
        assert!(!result.status.is_success());
    }

    #[tokio::test]
    async fn test_invoke_invalid_request_fails_record() {
        let executor = MockExecutor::new(Behaviour::Echo);
        let invoker = invoker_with(Arc::clone(&executor), 60);
        let record = ExecutionRecord::pending();
        let bad = ExecutionRequest::new("", ExecutionTarget::new("q"));

        let result = invoker
            .invoke(executor, bad, &record, CancellationToken::new())
            .await;
        assert!(result.error().unwrap().contains("artifact location"));
    }

    #[tokio::test]
    async fn test_invoke_on_terminal_record_leaves_it_untouched() {
        let executor = MockExecutor::new(Behaviour::Echo);
        let invoker = invoker_with(Arc::clone(&executor), 60);
        let record = ExecutionRecord::pending();
        record.fail("rejected upstream").unwrap();

        let result = invoker
            .invoke(executor, request(), &record, CancellationToken::new())
            .await;
        assert_eq!(result.error(), Some("rejected upstream"));
    }

    #[tokio::test]
    async fn test_dispatch_no_compatible_executor() {
        let invoker = invoker_with(MockExecutor::new(Behaviour::Echo), 60);
        let record = ExecutionRecord::pending();
        let imp = Implementation::new("vqe", ProgrammingLanguage::Python)
            .with_sdk(SdkRef::new("Cirq"));

        let err = invoker
            .dispatch(&imp, request(), &record, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::NoCompatibleExecutor { .. }));
        let snapshot = record.snapshot();
        assert!(snapshot.error().unwrap().contains("Cirq"));
    }

    #[tokio::test]
    async fn test_spawn_runs_in_background() {
        let invoker = Arc::new(invoker_with(MockExecutor::new(Behaviour::Echo), 60));
        let record = ExecutionRecord::pending();
        let imp = Implementation::new("qaoa", ProgrammingLanguage::Python)
            .with_sdk(SdkRef::new("Qiskit"));

        let handle = invoker.spawn(imp, request(), record.clone(), CancellationToken::new());
        let polled = record.wait_terminal().await;
        let returned = handle.await.unwrap().unwrap();

        assert_eq!(polled, returned);
        assert!(returned.status.is_success());
    }
}
