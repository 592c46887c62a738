//! Sync command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use qcat_model::CatalogSnapshot;
use qcat_sync::{FactStoreAdapter, Outbox, Reconciler, SyncWorker};

use super::common::{open_fact_base, open_outbox};
use crate::config::QcatConfig;

/// Load a catalog snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<CatalogSnapshot> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&source)
        .with_context(|| format!("Invalid catalog snapshot: {}", path.display()))
}

/// Execute the sync command.
pub async fn execute(config: &QcatConfig, snapshot: &Path) -> Result<()> {
    let snapshot = load_snapshot(snapshot)?;
    let outbox = Arc::new(open_outbox(config)?);
    let facts = Arc::new(open_fact_base(config).await?);

    println!(
        "{} Reconciling {} implementations and {} QPUs into {}",
        style("→").cyan().bold(),
        snapshot.implementations.len(),
        snapshot.qpus.len(),
        facts.base_dir().display()
    );

    let report = Reconciler::new(outbox.clone(), facts.clone())
        .reconcile(&snapshot)
        .await?;

    for skipped in &report.skipped {
        println!(
            "  {} {} {}: {}",
            style("!").yellow().bold(),
            skipped.kind,
            skipped.id,
            skipped.reason
        );
    }

    let worker = SyncWorker::new(
        outbox.clone(),
        FactStoreAdapter::new(facts),
        config.sync.clone(),
    );
    let drained = worker.run_until_idle().await?;
    let remaining = outbox.len().await?;

    println!(
        "{} {} updated, {} retracted, {} skipped",
        style("✓").green().bold(),
        report.updated,
        report.retracted,
        report.skipped.len()
    );
    println!(
        "  Applied: {}  Failed: {}  Still queued: {}",
        drained.applied, drained.failed, remaining
    );

    if remaining > 0 {
        println!(
            "  {} Run `qcat outbox` to inspect entries awaiting retry",
            style("!").yellow()
        );
    }
    Ok(())
}
