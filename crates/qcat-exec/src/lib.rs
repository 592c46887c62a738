//! qcat execution dispatch
//!
//! Selects, among a registered set of executor plugins, the one able to run
//! an algorithm implementation, and invokes it.
//!
//! # Overview
//!
//! - [`Executor`]: the plugin interface. Each executor advertises
//!   [`ExecutorCapabilities`] (languages and SDK names) and runs requests.
//! - [`ExecutorRegistry`]: executors in registration order, with
//!   first-match [`select`](ExecutorRegistry::select).
//! - [`ExecutionInvoker`]: runs the selected executor with a timeout and a
//!   cancellation token and drives the caller's [`ExecutionRecord`].
//! - [`ExecutionResult`] / [`ExecutionStatus`]: the execution state machine
//!   (`Pending → Running → Succeeded | Failed`).
//!
//! # Example: dispatching an implementation
//!
//! ```ignore
//! use std::sync::Arc;
//! use qcat_exec::{
//!     ExecutionInvoker, ExecutionRecord, ExecutionRequest, ExecutionTarget, ExecutorRegistry,
//!     InvokerConfig,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! let registry = ExecutorRegistry::new()
//!     .with_executor(qiskit_runner)
//!     .with_executor(forest_runner);
//! let invoker = ExecutionInvoker::new(Arc::new(registry), InvokerConfig::default());
//!
//! let request = ExecutionRequest::new(
//!     implementation.file_location.clone().unwrap_or_default(),
//!     ExecutionTarget::new("ibmq_qasm_simulator"),
//! )
//! .with_parameter("shots", "1024");
//!
//! let record = ExecutionRecord::pending();
//! let result = invoker
//!     .dispatch(&implementation, request, &record, CancellationToken::new())
//!     .await?;
//! println!("{}", result.status);
//! ```
//!
//! # Implementing an executor
//!
//! ```ignore
//! use async_trait::async_trait;
//! use qcat_exec::{
//!     ExecResult, ExecutionRequest, Executor, ExecutorCapabilities, OutputParameters,
//! };
//! use qcat_model::ProgrammingLanguage;
//! use tokio_util::sync::CancellationToken;
//!
//! struct QiskitRunner {
//!     capabilities: ExecutorCapabilities,
//! }
//!
//! #[async_trait]
//! impl Executor for QiskitRunner {
//!     fn name(&self) -> &str { "qiskit-runner" }
//!
//!     fn capabilities(&self) -> &ExecutorCapabilities {
//!         &self.capabilities
//!     }
//!
//!     async fn execute(
//!         &self,
//!         request: &ExecutionRequest,
//!         cancel: CancellationToken,
//!     ) -> ExecResult<OutputParameters> {
//!         // Fetch request.artifact_location and run it on request.target
//!         # todo!()
//!     }
//! }
//! ```

pub mod capability;
pub mod error;
pub mod execution;
pub mod executor;
pub mod invoker;
pub mod registry;

pub use capability::ExecutorCapabilities;
pub use error::{ExecError, ExecResult};
pub use execution::{ExecutionId, ExecutionRecord, ExecutionResult, ExecutionStatus};
pub use executor::{
    ExecutionRequest, ExecutionTarget, Executor, InputParameters, OutputParameters,
};
pub use invoker::{ExecutionInvoker, InvokerConfig};
pub use registry::ExecutorRegistry;

pub use tokio_util::sync::CancellationToken;
