//! qcat Command-Line Interface
//!
//! Dispatches algorithm implementations to configured executors and keeps
//! the Prolog knowledge base in step with the catalog.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::common::parse_key_val;
use commands::{executors, outbox, run, select, sync};
use config::QcatConfig;

/// qcat - execution dispatch and knowledge-base sync for a quantum algorithm catalog
#[derive(Parser)]
#[command(name = "qcat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (YAML)
    #[arg(short, long, env = "QCAT_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured executors in selection order
    Executors,

    /// Show which executor would run a (language, SDK) pair
    Select {
        /// Programming language (case-sensitive, e.g. Python)
        #[arg(short, long)]
        language: String,

        /// SDK name (case-sensitive, e.g. Qiskit)
        #[arg(short, long)]
        sdk: String,
    },

    /// Dispatch and run an implementation artifact
    Run {
        /// Programming language (case-sensitive, e.g. Python)
        #[arg(short, long)]
        language: String,

        /// SDK name (case-sensitive, e.g. Qiskit)
        #[arg(short, long)]
        sdk: String,

        /// Location of the implementation artifact
        #[arg(short, long)]
        artifact: String,

        /// Target QPU name
        #[arg(short, long)]
        qpu: String,

        /// Target provider
        #[arg(long)]
        provider: Option<String>,

        /// Input parameter (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// Timeout in seconds (overrides the configuration)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Reconcile the fact base with a catalog snapshot
    Sync {
        /// Catalog snapshot (JSON)
        #[arg(long)]
        snapshot: PathBuf,
    },

    /// Show pending outbox entries
    Outbox {
        /// Maximum entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let result = match QcatConfig::load(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Executors => executors::execute(&config),

            Commands::Select { language, sdk } => select::execute(&config, &language, &sdk),

            Commands::Run {
                language,
                sdk,
                artifact,
                qpu,
                provider,
                params,
                timeout,
            } => {
                run::execute(
                    &config,
                    run::RunArgs {
                        language,
                        sdk,
                        artifact,
                        qpu,
                        provider,
                        params,
                        timeout,
                    },
                )
                .await
            }

            Commands::Sync { snapshot } => sync::execute(&config, &snapshot).await,

            Commands::Outbox { limit } => outbox::execute(&config, limit).await,
        },
        Err(e) => Err(e),
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
