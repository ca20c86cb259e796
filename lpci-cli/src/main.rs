//! lpci CLI
//!
//! Command-line interface for triggering Launchpad snap builds and
//! collecting their results.

mod commands;
mod config;

use clap::Parser;
use colored::*;
use commands::{Commands, handle_command};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_CRATES: [&str; 4] = ["lpci_cli", "lpci_runner", "lpci_client", "lpci_core"];

#[derive(Parser)]
#[command(name = "lpci")]
#[command(about = "Launchpad snap build CI", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Launchpad API root
    #[arg(long, env = "LPCI_API_ROOT", default_value = lpci_client::DEFAULT_API_ROOT)]
    api_root: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            println!("{} {:#}", "ERROR:".red().bold(), e);
            1
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = config::load_config(cli.api_root)?;
    handle_command(cli.command, config).await
}

/// Logs go to stderr; stdout carries the operator-facing report
fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let default_filter = LOG_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
