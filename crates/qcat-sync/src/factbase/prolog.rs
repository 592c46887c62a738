//! Prolog source-file fact base.
//!
//! Each record is rendered to its own `.pl` file, so a Prolog engine can
//! consult the whole directory tree:
//!
//! ```text
//! <base>/implementations/<id>.pl
//! <base>/qpus/<id>.pl
//! ```
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! reader never sees a partially written record.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use qcat_model::EntityId;
use tokio::fs;

use crate::error::{SyncError, SyncResult};
use crate::fact::{FactKind, ImplementationFact, QpuFact};
use crate::factbase::FactBase;

const EXTENSION: &str = "pl";

/// Fact base backed by a directory of Prolog files.
#[derive(Debug, Clone)]
pub struct PrologFileFactBase {
    base_dir: PathBuf,
}

impl PrologFileFactBase {
    /// Open (and create if needed) a fact base rooted at `base_dir`.
    pub async fn new(base_dir: impl AsRef<Path>) -> SyncResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(base_dir.join(dir_name(FactKind::Implementation))).await?;
        fs::create_dir_all(base_dir.join(dir_name(FactKind::Qpu))).await?;

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the file holding a record.
    pub fn fact_path(&self, kind: FactKind, id: EntityId) -> PathBuf {
        self.base_dir
            .join(dir_name(kind))
            .join(format!("{id}.{EXTENSION}"))
    }

    async fn write_fact(&self, kind: FactKind, id: EntityId, contents: String) -> SyncResult<()> {
        let path = self.fact_path(kind, id);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));

        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, &path).await?;

        tracing::trace!(kind = %kind, id = %id, path = ?path, "Wrote fact file");
        Ok(())
    }

    async fn remove_fact(&self, kind: FactKind, id: EntityId) -> SyncResult<()> {
        let path = self.fact_path(kind, id);
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::trace!(kind = %kind, id = %id, "Removed fact file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::IoError(e)),
        }
    }
}

#[async_trait]
impl FactBase for PrologFileFactBase {
    async fn assert_implementation(&self, fact: &ImplementationFact) -> SyncResult<()> {
        self.write_fact(FactKind::Implementation, fact.id, render_implementation(fact))
            .await
    }

    async fn update_implementation(&self, fact: &ImplementationFact) -> SyncResult<()> {
        self.write_fact(FactKind::Implementation, fact.id, render_implementation(fact))
            .await
    }

    async fn retract_implementation(&self, id: EntityId) -> SyncResult<()> {
        self.remove_fact(FactKind::Implementation, id).await
    }

    async fn assert_qpu(&self, fact: &QpuFact) -> SyncResult<()> {
        self.write_fact(FactKind::Qpu, fact.id, render_qpu(fact)).await
    }

    async fn update_qpu(&self, fact: &QpuFact) -> SyncResult<()> {
        self.write_fact(FactKind::Qpu, fact.id, render_qpu(fact)).await
    }

    async fn retract_qpu(&self, id: EntityId) -> SyncResult<()> {
        self.remove_fact(FactKind::Qpu, id).await
    }

    async fn fact_ids(&self, kind: FactKind) -> SyncResult<Vec<EntityId>> {
        let dir = self.base_dir.join(dir_name(kind));
        let mut ids = Vec::new();

        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match EntityId::parse(stem) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    tracing::warn!("Ignoring fact file {:?}: {}", path, e);
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

fn dir_name(kind: FactKind) -> &'static str {
    match kind {
        FactKind::Implementation => "implementations",
        FactKind::Qpu => "qpus",
    }
}

/// Render an implementation record as Prolog clauses.
pub fn render_implementation(fact: &ImplementationFact) -> String {
    let id = quote_atom(&fact.id.to_string());
    let mut out = String::new();

    let _ = writeln!(
        out,
        "implementation({id}, {}).",
        quote_atom(&fact.algorithm_id.to_string())
    );
    let _ = writeln!(out, "requiredSdk({id}, {}).", quote_atom(&fact.sdk_name));

    let rule = fact.selection_rule.trim_end();
    if !rule.is_empty() {
        out.push_str(rule);
        out.push('\n');
    }
    out
}

/// Render a QPU record as Prolog clauses.
pub fn render_qpu(fact: &QpuFact) -> String {
    let id = quote_atom(&fact.id.to_string());
    let mut out = String::new();

    let _ = writeln!(out, "providesQubits({id}, {}).", fact.qubit_count);
    for sdk in &fact.sdk_names {
        let _ = writeln!(out, "usedSdk({id}, {}).", quote_atom(sdk));
    }
    let _ = writeln!(out, "t1Time({id}, {}).", format_float(fact.t1));
    let _ = writeln!(out, "maxGateTime({id}, {}).", format_float(fact.max_gate_time));
    out
}

/// Quote a string as a Prolog atom.
pub fn quote_atom(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

// Prolog reads `50` as an integer; floats need a decimal point.
fn format_float(value: f64) -> String {
    let s = value.to_string();
    if s.contains('.') { s } else { format!("{s}.0") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> EntityId {
        EntityId::parse(s).unwrap()
    }

    #[test]
    fn test_render_implementation() {
        let fact = ImplementationFact {
            id: id("00000000-0000-0000-0000-000000000001"),
            sdk_name: "Qiskit".into(),
            algorithm_id: id("00000000-0000-0000-0000-0000000000aa"),
            selection_rule: "executionFactor('00000000-0000-0000-0000-000000000001', 1).\n"
                .into(),
        };

        assert_eq!(
            render_implementation(&fact),
            "implementation('00000000-0000-0000-0000-000000000001', '00000000-0000-0000-0000-0000000000aa').\n\
             requiredSdk('00000000-0000-0000-0000-000000000001', 'Qiskit').\n\
             executionFactor('00000000-0000-0000-0000-000000000001', 1).\n"
        );
    }

    #[test]
    fn test_render_implementation_without_rule() {
        let fact = ImplementationFact {
            id: EntityId::new(),
            sdk_name: "Forest".into(),
            algorithm_id: EntityId::new(),
            selection_rule: String::new(),
        };
        assert_eq!(render_implementation(&fact).lines().count(), 2);
    }

    #[test]
    fn test_render_qpu() {
        let fact = QpuFact {
            id: id("00000000-0000-0000-0000-000000000002"),
            qubit_count: 5,
            sdk_names: vec!["Qiskit".into(), "Forest".into()],
            t1: 50.0,
            max_gate_time: 0.25,
        };

        assert_eq!(
            render_qpu(&fact),
            "providesQubits('00000000-0000-0000-0000-000000000002', 5).\n\
             usedSdk('00000000-0000-0000-0000-000000000002', 'Qiskit').\n\
             usedSdk('00000000-0000-0000-0000-000000000002', 'Forest').\n\
             t1Time('00000000-0000-0000-0000-000000000002', 50.0).\n\
             maxGateTime('00000000-0000-0000-0000-000000000002', 0.25).\n"
        );
    }

    #[test]
    fn test_quote_atom_escapes() {
        assert_eq!(quote_atom("Qiskit"), "'Qiskit'");
        assert_eq!(quote_atom("O'Brien"), "'O\\'Brien'");
        assert_eq!(quote_atom("a\\b"), "'a\\\\b'");
    }

    #[tokio::test]
    async fn test_file_lifecycle() {
        let dir = TempDir::new().unwrap();
        let base = PrologFileFactBase::new(dir.path()).await.unwrap();
        let qpu_id = EntityId::new();
        let fact = QpuFact {
            id: qpu_id,
            qubit_count: 5,
            sdk_names: vec!["Qiskit".into()],
            t1: 50.0,
            max_gate_time: 200.0,
        };

        base.assert_qpu(&fact).await.unwrap();
        let path = base.fact_path(FactKind::Qpu, qpu_id);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("providesQubits"));
        assert_eq!(base.fact_ids(FactKind::Qpu).await.unwrap(), vec![qpu_id]);

        let updated = QpuFact {
            qubit_count: 20,
            ..fact
        };
        base.update_qpu(&updated).await.unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains(", 20)."));

        base.retract_qpu(qpu_id).await.unwrap();
        assert!(!path.exists());
        // Second retract is a no-op.
        base.retract_qpu(qpu_id).await.unwrap();
        assert!(base.fact_ids(FactKind::Qpu).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fact_ids_skip_foreign_files() {
        let dir = TempDir::new().unwrap();
        let base = PrologFileFactBase::new(dir.path()).await.unwrap();

        std::fs::write(dir.path().join("implementations/README.txt"), "notes").unwrap();
        std::fs::write(dir.path().join("implementations/not-an-id.pl"), "").unwrap();

        assert!(
            base.fact_ids(FactKind::Implementation)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
