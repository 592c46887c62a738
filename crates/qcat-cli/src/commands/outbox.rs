//! Outbox command implementation.

use anyhow::Result;
use console::style;
use qcat_sync::Outbox;

use super::common::open_outbox;
use crate::config::QcatConfig;

/// Execute the outbox command.
pub async fn execute(config: &QcatConfig, limit: usize) -> Result<()> {
    let outbox = open_outbox(config)?;
    let total = outbox.len().await?;

    if total == 0 {
        println!("{} Outbox is empty", style("✓").green().bold());
        return Ok(());
    }

    println!(
        "{} {} pending mutation(s) in {}\n",
        style("qcat").cyan().bold(),
        total,
        config.storage.outbox_path().display()
    );
    println!(
        "  {:<8} {:<8} {:<15} {:<36} {:>8}  {}",
        "SEQ", "OP", "KIND", "ID", "ATTEMPTS", "NEXT ATTEMPT"
    );

    for entry in outbox.pending(limit).await? {
        let (kind, id) = entry.key();
        let next = entry
            .next_attempt_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "now".to_string());
        println!(
            "  {:<8} {:<8} {:<15} {:<36} {:>8}  {}",
            entry.seq,
            entry.mutation.op(),
            kind.as_str(),
            id.to_string(),
            entry.attempts,
            next
        );
        if let Some(error) = &entry.last_error {
            println!("           {}", style(error).red());
        }
    }

    if total > limit {
        println!("\n  ... and {} more", total - limit);
    }
    Ok(())
}
