//! Commands module
//!
//! Defines the workflow commands and their handlers.

mod base;
mod snap;

pub use base::BaseArgs;
pub use snap::SnapArgs;

use anyhow::Result;
use clap::Subcommand;
use lpci_runner::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild a base snap when its packages or branch changed
    Base(BaseArgs),
    /// Build a snap on Launchpad and collect the results
    Snap(SnapArgs),
}

/// Handle a CLI command
///
/// Returns the process exit code: a finished run whose builds failed is
/// not an error, but it still exits with 1.
pub async fn handle_command(command: Commands, config: Config) -> Result<i32> {
    match command {
        Commands::Base(args) => base::handle_base_command(args, config).await,
        Commands::Snap(args) => snap::handle_snap_command(args, config).await,
    }
}
