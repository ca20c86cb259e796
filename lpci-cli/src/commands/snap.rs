//! Snap command handler
//!
//! Builds a snap on Launchpad for a set of architectures.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use lpci_client::CredentialStore;
use lpci_runner::Config;
use lpci_runner::repository::HttpLaunchpadRepository;
use lpci_runner::workflow::{LaunchpadRepositories, SnapOptions, SnapWorkflow};
use tracing::debug;

#[derive(Args)]
pub struct SnapArgs {
    /// Name of the snap to build
    #[arg(short, long)]
    pub snap: String,

    /// Trigger a publish build instead of a daily one
    ///
    /// Launchpad requests both the same way; the flag is kept for callers
    /// that pass it.
    #[arg(short, long)]
    pub publish: bool,

    /// Git repository for a new ephemeral recipe
    #[arg(long)]
    pub git_repo: Option<String>,

    /// Git branch to build; `snap-*` and `latest*` select a static recipe
    #[arg(long)]
    pub git_repo_branch: Option<String>,

    /// Architectures to build for, separated by ','
    #[arg(short, long, value_delimiter = ',')]
    pub architectures: Vec<String>,

    /// Directory results are saved to
    #[arg(short, long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Base of the build
    #[arg(long, default_value = "core")]
    pub base: String,

    /// Snapcraft channel to install from
    #[arg(long)]
    pub snapcraft_channel: Option<String>,

    /// Credentials file content
    #[arg(long, env = "LP_CREDENTIALS", hide = true, hide_env_values = true)]
    pub lp_credentials: Option<String>,
}

/// Handle the snap command
pub async fn handle_snap_command(args: SnapArgs, config: Config) -> Result<i32> {
    let material = match args.lp_credentials.as_deref() {
        Some(material) if !material.is_empty() => material,
        _ => {
            println!("{} LP_CREDENTIALS is empty", "ERROR:".red().bold());
            return Ok(1);
        }
    };
    let store = CredentialStore::from_material(material).context("Failed to stage credentials")?;
    let credentials = store.load().context("Failed to read LP_CREDENTIALS")?;

    if args.publish {
        debug!("Publish build requested for {}", args.snap);
    }

    let client = config.launchpad_client(Some(credentials))?;
    let launchpad = LaunchpadRepositories::shared(HttpLaunchpadRepository::new(Arc::new(client)));
    let workflow = SnapWorkflow::new(config, launchpad);

    let options = SnapOptions {
        snap: args.snap,
        git_repo: args.git_repo,
        git_branch: args.git_repo_branch,
        architectures: args
            .architectures
            .into_iter()
            .map(|arch| arch.trim().to_string())
            .filter(|arch| !arch.is_empty())
            .collect(),
        results_dir: args.results_dir,
        base: args.base,
        snapcraft_channel: args.snapcraft_channel,
    };

    let verdict = workflow.run(&options).await?;
    Ok(if verdict.is_success() { 0 } else { 1 })
}
