//! qcat process executor
//!
//! Runs algorithm implementations as external programs. Each configured
//! [`ProcessExecutor`] declares the languages and SDKs it serves, so several
//! runners (one per SDK toolchain, say) can be registered side by side in an
//! [`ExecutorRegistry`](qcat_exec::ExecutorRegistry).
//!
//! # Protocol
//!
//! | Channel | Content |
//! |---------|---------|
//! | `QCAT_ARTIFACT_LOCATION` | Location of the implementation artifact |
//! | `QCAT_TARGET_QPU` | Target QPU name |
//! | `QCAT_TARGET_PROVIDER` | Target provider (only if known) |
//! | stdin | Input parameters as a JSON object of strings |
//! | stdout | Output parameters as a JSON object |
//!
//! A non-zero exit status fails the execution with the child's stderr.
//! Cancelling the execution kills the child.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qcat_adapter_process::{ProcessExecutor, ProcessExecutorConfig};
//! use qcat_exec::ExecutorRegistry;
//! use qcat_model::ProgrammingLanguage;
//!
//! let qiskit = ProcessExecutor::new(
//!     ProcessExecutorConfig::new("qiskit-runner", "python3")
//!         .with_arg("-m")
//!         .with_arg("qcat_runner.qiskit")
//!         .with_language(ProgrammingLanguage::Python)
//!         .with_sdk("Qiskit"),
//! )?;
//!
//! let registry = ExecutorRegistry::new().with_executor(Arc::new(qiskit));
//! ```

mod error;
mod executor;

pub use error::{ProcessError, ProcessResult};
pub use executor::{
    ENV_ARTIFACT_LOCATION, ENV_TARGET_PROVIDER, ENV_TARGET_QPU, ProcessExecutor,
    ProcessExecutorConfig, parse_output,
};
