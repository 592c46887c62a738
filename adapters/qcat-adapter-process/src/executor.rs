//! External process executor.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use qcat_exec::{
    CancellationToken, ExecError, ExecResult, ExecutionRequest, Executor, ExecutorCapabilities,
    OutputParameters,
};
use qcat_model::ProgrammingLanguage;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::error::{ProcessError, ProcessResult};

/// Environment variable holding the artifact location.
pub const ENV_ARTIFACT_LOCATION: &str = "QCAT_ARTIFACT_LOCATION";
/// Environment variable holding the target QPU name.
pub const ENV_TARGET_QPU: &str = "QCAT_TARGET_QPU";
/// Environment variable holding the target provider, when known.
pub const ENV_TARGET_PROVIDER: &str = "QCAT_TARGET_PROVIDER";

/// Configuration of one process executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessExecutorConfig {
    /// Unique executor name.
    pub name: String,
    /// Program to run.
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Languages this executor runs.
    pub languages: Vec<ProgrammingLanguage>,
    /// SDK names this executor runs. Case-sensitive.
    pub sdks: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Extra environment for the child.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ProcessExecutorConfig {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            languages: Vec::new(),
            sdks: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_language(mut self, language: ProgrammingLanguage) -> Self {
        self.languages.push(language);
        self
    }

    pub fn with_sdk(mut self, sdk: impl Into<String>) -> Self {
        self.sdks.push(sdk.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Check that the configuration can produce a usable executor.
    pub fn validate(&self) -> ProcessResult<()> {
        if self.name.trim().is_empty() {
            return Err(ProcessError::InvalidConfig("name is empty".into()));
        }
        if self.program.trim().is_empty() {
            return Err(ProcessError::InvalidConfig(format!(
                "{}: program is empty",
                self.name
            )));
        }
        if self.languages.is_empty() {
            return Err(ProcessError::InvalidConfig(format!(
                "{}: no languages declared",
                self.name
            )));
        }
        if self.sdks.iter().all(|s| s.trim().is_empty()) {
            return Err(ProcessError::InvalidConfig(format!(
                "{}: no SDKs declared",
                self.name
            )));
        }
        Ok(())
    }
}

/// Executor that runs an implementation as a child process.
///
/// The child receives the artifact location and target in its environment
/// and the input parameters as a JSON object on stdin. It must print a JSON
/// object of output parameters on stdout and exit with status 0.
#[derive(Debug)]
pub struct ProcessExecutor {
    config: ProcessExecutorConfig,
    capabilities: ExecutorCapabilities,
}

impl ProcessExecutor {
    pub fn new(config: ProcessExecutorConfig) -> ProcessResult<Self> {
        config.validate()?;
        let capabilities = ExecutorCapabilities::new()
            .with_languages(config.languages.iter().copied())
            .with_sdks(config.sdks.iter().cloned());
        Ok(Self {
            config,
            capabilities,
        })
    }

    pub fn config(&self) -> &ProcessExecutorConfig {
        &self.config
    }

    fn command(&self, request: &ExecutionRequest) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .envs(&self.config.env)
            .env(ENV_ARTIFACT_LOCATION, &request.artifact_location)
            .env(ENV_TARGET_QPU, &request.target.qpu)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(provider) = &request.target.provider {
            cmd.env(ENV_TARGET_PROVIDER, provider);
        }
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    async fn run(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> ProcessResult<Option<OutputParameters>> {
        let mut child = self
            .command(request)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        let input = serde_json::to_vec(&request.input_parameters)?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Pipes are drained while waiting so a chatty child cannot block on
        // a full buffer.
        let finished = tokio::select! {
            result = async {
                tokio::join!(
                    write_input(stdin, &input),
                    read_pipe(stdout),
                    read_pipe(stderr),
                    child.wait(),
                )
            } => Some(result),
            _ = cancel.cancelled() => None,
        };

        let Some((written, stdout, stderr, status)) = finished else {
            tracing::debug!(executor = %self.config.name, "Killing cancelled child");
            let _ = child.start_kill();
            return Ok(None);
        };

        written?;
        let status = status?;
        let stdout = stdout?;
        let stderr = stderr?;

        check_status(&self.config.program, status, &stderr)?;
        parse_output(&stdout).map(Some)
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &ExecutorCapabilities {
        &self.capabilities
    }

    async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: CancellationToken,
    ) -> ExecResult<OutputParameters> {
        tracing::info!(
            executor = %self.config.name,
            program = %self.config.program,
            artifact = %request.artifact_location,
            qpu = %request.target.qpu,
            "Starting process"
        );

        match self.run(request, &cancel).await? {
            Some(outputs) => Ok(outputs),
            None => Err(ExecError::Cancelled),
        }
    }
}

async fn write_input(
    stdin: Option<tokio::process::ChildStdin>,
    input: &[u8],
) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(input).await {
        // A child that ignores its input may exit before reading it.
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(e),
        Ok(()) => {
            drop(stdin);
            Ok(())
        }
    }
}

async fn read_pipe(pipe: Option<impl AsyncRead + Unpin>) -> std::io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn check_status(program: &str, status: ExitStatus, stderr: &str) -> ProcessResult<()> {
    if status.success() {
        return Ok(());
    }
    Err(ProcessError::NonZeroExit {
        program: program.to_string(),
        code: status.code(),
        stderr: stderr.trim().to_string(),
    })
}

/// Parse child stdout into output parameters.
///
/// Empty output means no outputs. Non-string JSON values are kept in their
/// JSON text form.
pub fn parse_output(stdout: &str) -> ProcessResult<OutputParameters> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(OutputParameters::new());
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|e| ProcessError::InvalidOutput(format!("stdout is not JSON: {e}")))?;
    let serde_json::Value::Object(map) = value else {
        return Err(ProcessError::InvalidOutput(
            "stdout must be a JSON object".into(),
        ));
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        let outputs = parse_output(r#"{"counts": "{'00': 512}", "shots": 1024, "ok": true}"#)
            .unwrap();
        assert_eq!(outputs["counts"], "{'00': 512}");
        assert_eq!(outputs["shots"], "1024");
        assert_eq!(outputs["ok"], "true");

        assert!(parse_output("  \n").unwrap().is_empty());
        assert!(parse_output("[1, 2]").is_err());
        assert!(parse_output("hello").is_err());
    }

    #[test]
    fn test_config_validation() {
        let config = ProcessExecutorConfig::new("qiskit-runner", "python3")
            .with_language(ProgrammingLanguage::Python)
            .with_sdk("Qiskit");
        assert!(config.validate().is_ok());

        assert!(
            ProcessExecutorConfig::new("", "python3")
                .with_language(ProgrammingLanguage::Python)
                .with_sdk("Qiskit")
                .validate()
                .is_err()
        );
        assert!(
            ProcessExecutorConfig::new("x", "python3")
                .with_sdk("Qiskit")
                .validate()
                .is_err()
        );
        assert!(
            ProcessExecutorConfig::new("x", "python3")
                .with_language(ProgrammingLanguage::Python)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_capabilities_from_config() {
        let executor = ProcessExecutor::new(
            ProcessExecutorConfig::new("forest-runner", "python3")
                .with_language(ProgrammingLanguage::Python)
                .with_language(ProgrammingLanguage::Quil)
                .with_sdk("Forest"),
        )
        .unwrap();

        assert_eq!(executor.name(), "forest-runner");
        assert!(
            executor
                .capabilities()
                .supports(ProgrammingLanguage::Quil, "Forest")
        );
        assert!(
            !executor
                .capabilities()
                .supports(ProgrammingLanguage::Python, "forest")
        );
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
name: qiskit-runner
program: python3
args: ["-m", "qcat_runner"]
languages: [Python]
sdks: [Qiskit]
env:
  QISKIT_IBM_CHANNEL: ibm_quantum
"#;
        let config: ProcessExecutorConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.args, vec!["-m", "qcat_runner"]);
        assert_eq!(config.languages, vec![ProgrammingLanguage::Python]);
        assert_eq!(config.env["QISKIT_IBM_CHANNEL"], "ibm_quantum");
        assert!(config.working_dir.is_none());
    }
}
