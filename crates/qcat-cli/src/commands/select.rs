//! Select command implementation.

use anyhow::Result;
use console::style;

use super::common::{build_registry, parse_language};
use crate::config::QcatConfig;

/// Execute the select command.
pub fn execute(config: &QcatConfig, language: &str, sdk: &str) -> Result<()> {
    let registry = build_registry(config)?;
    let language = parse_language(language)?;

    let executor = registry.select(language, Some(sdk))?;
    println!(
        "{} {} ({}, {})",
        style("→").green().bold(),
        style(executor.name()).bold(),
        language,
        sdk
    );

    Ok(())
}
