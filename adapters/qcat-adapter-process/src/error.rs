//! Error types for the process executor.

use qcat_exec::ExecError;
use thiserror::Error;

/// Result type for process executor operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Errors that can occur when running an implementation as a process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The executor configuration is incomplete.
    #[error("Invalid process executor configuration: {0}")]
    InvalidConfig(String),

    /// The program could not be started.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("{program} exited with code {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The program printed something that is not a JSON object.
    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    /// IO error while talking to the child.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ProcessError> for ExecError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::Spawn { .. } | ProcessError::InvalidConfig(_) => {
                ExecError::ExecutorUnavailable(e.to_string())
            }
            ProcessError::Io(e) => ExecError::Io(e),
            ProcessError::Json(e) => ExecError::Serialization(e),
            _ => ExecError::ExecutionFailed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_display() {
        let err = ProcessError::NonZeroExit {
            program: "python3".into(),
            code: Some(2),
            stderr: "ModuleNotFoundError: qiskit".into(),
        };
        assert_eq!(
            err.to_string(),
            "python3 exited with code Some(2): ModuleNotFoundError: qiskit"
        );
    }

    #[test]
    fn test_mapping_to_exec_error() {
        let spawn = ProcessError::Spawn {
            program: "missing".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(matches!(
            ExecError::from(spawn),
            ExecError::ExecutorUnavailable(_)
        ));

        let exit = ProcessError::NonZeroExit {
            program: "sh".into(),
            code: Some(1),
            stderr: String::new(),
        };
        assert!(matches!(ExecError::from(exit), ExecError::ExecutionFailed(_)));
    }
}
