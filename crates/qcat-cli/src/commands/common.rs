//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use qcat_adapter_process::ProcessExecutor;
use qcat_exec::ExecutorRegistry;
use qcat_model::ProgrammingLanguage;
use qcat_sync::{PrologFileFactBase, SqliteOutbox};

use crate::config::QcatConfig;

/// Build the executor registry from the configured executors, in order.
pub fn build_registry(config: &QcatConfig) -> Result<ExecutorRegistry> {
    let mut registry = ExecutorRegistry::new();
    for executor in &config.executors {
        let executor = ProcessExecutor::new(executor.clone())
            .with_context(|| format!("Invalid executor '{}'", executor.name))?;
        registry.register(Arc::new(executor));
    }
    Ok(registry)
}

/// Parse a language name, listing the accepted names on failure.
pub fn parse_language(name: &str) -> Result<ProgrammingLanguage> {
    name.parse().map_err(|_| {
        let known: Vec<&str> = ProgrammingLanguage::ALL.iter().map(|l| l.as_str()).collect();
        anyhow::anyhow!("Unknown language '{name}'. Available: {}", known.join(", "))
    })
}

/// Parse a `key=value` pair.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' in '{s}'"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Open the durable outbox.
pub fn open_outbox(config: &QcatConfig) -> Result<SqliteOutbox> {
    let path = config.storage.outbox_path();
    ensure_parent(&path)?;
    SqliteOutbox::new(&path)
        .map_err(|e| anyhow::anyhow!("Failed to open outbox at {}: {}", path.display(), e))
}

/// Open the Prolog fact directory.
pub async fn open_fact_base(config: &QcatConfig) -> Result<PrologFileFactBase> {
    let dir = config.storage.facts_dir();
    PrologFileFactBase::new(&dir)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open fact base at {}: {}", dir.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcat_exec::Executor;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("shots=1024").unwrap(),
            ("shots".to_string(), "1024".to_string())
        );
        assert_eq!(
            parse_key_val("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("shots").is_err());
        assert!(parse_key_val("=1").is_err());
    }

    #[test]
    fn test_parse_language_is_case_sensitive() {
        assert_eq!(parse_language("Python").unwrap(), ProgrammingLanguage::Python);
        let err = parse_language("python").unwrap_err();
        assert!(err.to_string().contains("Available: Python"));
    }

    #[test]
    fn test_registry_keeps_config_order() {
        let config = QcatConfig::from_yaml(
            r#"
executors:
  - { name: a, program: sh, languages: [Python], sdks: [Qiskit] }
  - { name: b, program: sh, languages: [Python], sdks: [Forest] }
"#,
        )
        .unwrap();
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.names(), vec!["a", "b"]);
        let selected = registry
            .select(ProgrammingLanguage::Python, Some("Forest"))
            .unwrap();
        assert_eq!(selected.name(), "b");
    }
}
