//! Executors command implementation.

use anyhow::Result;
use console::style;

use super::common::build_registry;
use crate::config::QcatConfig;

/// Execute the executors command.
pub fn execute(config: &QcatConfig) -> Result<()> {
    let registry = build_registry(config)?;

    if registry.is_empty() {
        println!(
            "{} No executors configured. Add an `executors` section to qcat.yaml.",
            style("!").yellow().bold()
        );
        return Ok(());
    }

    println!(
        "{} Executors in selection order:\n",
        style("qcat").cyan().bold()
    );

    for (position, executor) in registry.executors().iter().enumerate() {
        let languages: Vec<String> = executor
            .supported_languages()
            .iter()
            .map(|l| l.to_string())
            .collect();
        let sdks: Vec<String> = executor.supported_sdks().iter().cloned().collect();

        println!(
            "  {} {}",
            style(format!("{}.", position + 1)).dim(),
            style(executor.name()).bold()
        );
        println!("    Languages: {}", languages.join(", "));
        println!("    SDKs: {}", sdks.join(", "));
        println!();
    }

    Ok(())
}
