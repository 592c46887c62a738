//! Run command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use console::style;
use qcat_exec::{
    CancellationToken, ExecutionInvoker, ExecutionRecord, ExecutionRequest, ExecutionResult,
    ExecutionStatus, ExecutionTarget, InvokerConfig,
};
use qcat_model::{Implementation, SdkRef};

use super::common::{build_registry, parse_language};
use crate::config::QcatConfig;

/// Arguments of the run command.
pub struct RunArgs {
    pub language: String,
    pub sdk: String,
    pub artifact: String,
    pub qpu: String,
    pub provider: Option<String>,
    pub params: Vec<(String, String)>,
    pub timeout: Option<u64>,
}

/// Execute the run command.
pub async fn execute(config: &QcatConfig, args: RunArgs) -> Result<()> {
    let registry = build_registry(config)?;
    let language = parse_language(&args.language)?;

    let invoker_config = match args.timeout {
        Some(secs) => InvokerConfig::with_timeout(Duration::from_secs(secs)),
        None => config.invoker.clone(),
    };
    let invoker = ExecutionInvoker::new(Arc::new(registry), invoker_config);

    let implementation = Implementation::new(args.artifact.clone(), language)
        .with_sdk(SdkRef::new(args.sdk.clone()))
        .with_file_location(args.artifact.clone());

    let mut target = ExecutionTarget::new(args.qpu);
    if let Some(provider) = args.provider {
        target = target.with_provider(provider);
    }
    let request = args
        .params
        .into_iter()
        .fold(ExecutionRequest::new(args.artifact, target), |req, (k, v)| {
            req.with_parameter(k, v)
        });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{} Interrupted, cancelling execution", style("!").yellow().bold());
            on_interrupt.cancel();
        }
    });

    println!(
        "{} Dispatching {} ({}, {})",
        style("→").cyan().bold(),
        implementation.name,
        language,
        args.sdk
    );

    let record = ExecutionRecord::new(ExecutionResult::new().for_implementation(implementation.id));
    let result = invoker
        .dispatch(&implementation, request, &record, cancel)
        .await?;

    print_result(&result)?;

    if let ExecutionStatus::Failed(reason) = &result.status {
        anyhow::bail!("Execution {} failed: {}", result.id, reason);
    }
    Ok(())
}

fn print_result(result: &ExecutionResult) -> Result<()> {
    let marker = if result.status.is_success() {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };
    println!(
        "\n{} {} on {}",
        marker,
        result.status.name(),
        result.executor.as_deref().unwrap_or("-")
    );
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
