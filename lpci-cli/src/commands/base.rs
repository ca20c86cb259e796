//! Base command handler
//!
//! Checks a base snap for changes and rebuilds it when needed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use lpci_client::{ClientError, CredentialStore, Credentials};
use lpci_core::domain::series::CoreSeries;
use lpci_runner::Config;
use lpci_runner::repository::{GitRepository, HttpLaunchpadRepository, StoreManifestSource};
use lpci_runner::workflow::{
    BaseOptions, BaseOutcome, BaseWorkflow, LaunchpadRepositories, parse_series,
};
use tracing::debug;

use crate::config::expand_home;

#[derive(Args)]
pub struct BaseArgs {
    /// Core series: "" for core, or 18, 20, 22, 24
    pub core_series: String,

    /// Launchpad credentials file
    #[arg(short, long, default_value = ".lp_credentials")]
    pub credentials: PathBuf,

    /// Directory built snaps are downloaded to
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Rebuild even if HEAD already carries a build tag
    #[arg(long)]
    pub no_git_check: bool,

    /// Log in anonymously and only report what would be built
    #[arg(long)]
    pub dry_run: bool,

    /// Credentials file content, preferred over --credentials
    #[arg(long, env = "LP_CREDENTIALS", hide = true, hide_env_values = true)]
    pub lp_credentials: Option<String>,
}

/// Handle the base command
pub async fn handle_base_command(args: BaseArgs, config: Config) -> Result<i32> {
    let credentials = if args.dry_run {
        debug!("Dry run, using anonymous access");
        None
    } else {
        match load_credentials(&args)? {
            Some(credentials) => Some(credentials),
            None => {
                println!("Credentials not found, no LP_CREDENTIALS var or file");
                return Ok(1);
            }
        }
    };

    let series = match parse_series(&args.core_series) {
        Ok(series) => series,
        Err(_) => {
            println!(
                "Invalid core series.  Only {} are supported.",
                CoreSeries::supported_args()
            );
            return Ok(1);
        }
    };

    let client = config.launchpad_client(credentials)?;
    let launchpad = LaunchpadRepositories::shared(HttpLaunchpadRepository::new(Arc::new(client)));
    let work_dir = std::env::current_dir().context("Failed to read the current directory")?;

    let workflow = BaseWorkflow::new(
        config,
        launchpad,
        Arc::new(GitRepository::new(work_dir)),
        Arc::new(StoreManifestSource::new()),
    );
    let options = BaseOptions {
        series,
        dry_run: args.dry_run,
        git_check: !args.no_git_check,
        output_dir: args.output_dir,
    };

    let outcome = workflow.run(&options).await?;
    print_outcome(&outcome);
    Ok(outcome.exit_code())
}

/// Reads credentials from LP_CREDENTIALS or the credentials file
///
/// Returns `None` when neither is available.
fn load_credentials(args: &BaseArgs) -> Result<Option<Credentials>> {
    let path = expand_home(&args.credentials);
    let store = match CredentialStore::from_env_or_path(args.lp_credentials.as_deref(), path) {
        Ok(store) => store,
        Err(ClientError::Credentials(reason)) => {
            debug!("No credentials: {}", reason);
            return Ok(None);
        }
        Err(e) => return Err(e).context("Failed to stage credentials"),
    };

    let credentials = store
        .load()
        .with_context(|| format!("Failed to read credentials from {}", store.path().display()))?;
    Ok(Some(credentials))
}

fn print_outcome(outcome: &BaseOutcome) {
    match outcome {
        BaseOutcome::Built(verdict) if verdict.is_success() => {
            println!(
                "{}",
                format!("{} build(s) succeeded", verdict.succeeded.len()).green()
            );
        }
        BaseOutcome::Built(verdict) => {
            println!(
                "{}",
                format!(
                    "{} build(s) failed, {} cancelled",
                    verdict.failed.len(),
                    verdict.cancelled.len()
                )
                .red()
            );
            for error in &verdict.artifact_errors {
                debug!("Artifact error: {}", error);
            }
        }
        _ => {}
    }
}
