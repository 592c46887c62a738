//! CLI configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use qcat_adapter_process::ProcessExecutorConfig;
use qcat_exec::InvokerConfig;
use qcat_sync::SyncConfig;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "QCAT_STATE_DIR";

/// Top-level `qcat.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcatConfig {
    /// Executors in registration order. Order decides selection.
    pub executors: Vec<ProcessExecutorConfig>,
    pub invoker: InvokerConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
}

/// Where local state lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_dir: Option<PathBuf>,
    /// Outbox database. Defaults to `<state_dir>/outbox.db`.
    pub outbox_path: Option<PathBuf>,
    /// Prolog fact directory. Defaults to `<state_dir>/facts`.
    pub facts_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        if let Some(dir) = std::env::var_os(STATE_DIR_ENV) {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .map(|d| d.join("qcat"))
            .unwrap_or_else(|| std::env::temp_dir().join("qcat"))
    }

    pub fn outbox_path(&self) -> PathBuf {
        self.outbox_path
            .clone()
            .unwrap_or_else(|| self.state_dir().join("outbox.db"))
    }

    pub fn facts_dir(&self) -> PathBuf {
        self.facts_dir
            .clone()
            .unwrap_or_else(|| self.state_dir().join("facts"))
    }
}

impl QcatConfig {
    /// Parse a YAML document.
    pub fn from_yaml(source: &str) -> Result<Self> {
        serde_yaml_ng::from_str(source).context("Invalid configuration")
    }

    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            tracing::debug!("No configuration file given, using defaults");
            return Ok(Self::default());
        };

        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&source).with_context(|| format!("In {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcat_model::ProgrammingLanguage;

    #[test]
    fn test_full_config() {
        let config = QcatConfig::from_yaml(
            r#"
executors:
  - name: qiskit-runner
    program: python3
    args: ["-m", "runners.qiskit"]
    languages: [Python]
    sdks: [Qiskit]
  - name: forest-runner
    program: python3
    languages: [Python, Quil]
    sdks: [Forest]
invoker:
  timeout_secs: 120
sync:
  max_backoff_ms: 5000
storage:
  state_dir: /var/lib/qcat
  facts_dir: /srv/prolog/facts
"#,
        )
        .unwrap();

        assert_eq!(config.executors.len(), 2);
        assert_eq!(config.executors[0].name, "qiskit-runner");
        assert_eq!(
            config.executors[1].languages,
            vec![ProgrammingLanguage::Python, ProgrammingLanguage::Quil]
        );
        assert_eq!(config.invoker.timeout_secs, 120);
        assert_eq!(config.sync.max_backoff_ms, 5000);
        assert_eq!(config.sync.batch_size, SyncConfig::default().batch_size);
        assert_eq!(
            config.storage.outbox_path(),
            PathBuf::from("/var/lib/qcat/outbox.db")
        );
        assert_eq!(
            config.storage.facts_dir(),
            PathBuf::from("/srv/prolog/facts")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = QcatConfig::from_yaml("{}").unwrap();
        assert!(config.executors.is_empty());
        assert_eq!(config.invoker, InvokerConfig::default());
        assert_eq!(config.sync, SyncConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("qcat.yaml");
        std::fs::write(&path, "invoker:\n  timeout_secs: 7\n").unwrap();

        let config = QcatConfig::load(Some(&path)).unwrap();
        assert_eq!(config.invoker.timeout_secs, 7);

        assert!(QcatConfig::load(Some(&dir.path().join("missing.yaml"))).is_err());
        assert_eq!(QcatConfig::load(None).unwrap(), QcatConfig::default());
    }
}
