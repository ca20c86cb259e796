//! Snap build workflow
//!
//! Builds a snap on Launchpad for a set of architectures, either from a
//! static team recipe or from an ephemeral recipe created for the run, then
//! waits for every build and collects logs and snaps.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use colored::Colorize;
use lpci_core::domain::build::Verdict;
use lpci_core::domain::series::{default_snapcraft_channel, series_for_base};

use crate::config::Config;
use crate::error::Result;
use crate::scheduler::{BuildPoller, Probe};
use crate::service::{
    BuildTrigger, PreparedRecipe, ReconcileMode, ReconcileOptions, Reconciler, RecipeSource,
    SnapTarget,
};
use crate::workflow::LaunchpadRepositories;

#[derive(Debug, Clone)]
pub struct SnapOptions {
    /// Name of the snap to build
    pub snap: String,
    pub git_repo: Option<String>,
    pub git_branch: Option<String>,
    /// Requested architectures; empty means every enabled one
    pub architectures: Vec<String>,
    pub results_dir: PathBuf,
    /// Base snap the build runs on, e.g. `core22`
    pub base: String,
    /// Snapcraft channel; the series default when unset
    pub snapcraft_channel: Option<String>,
}

/// Builds a snap and collects the results
pub struct SnapWorkflow {
    config: Config,
    launchpad: LaunchpadRepositories,
}

impl SnapWorkflow {
    pub fn new(config: Config, launchpad: LaunchpadRepositories) -> Self {
        Self { config, launchpad }
    }

    /// Runs the build and returns the verdict
    ///
    /// An ephemeral recipe is deleted before returning, whatever happened
    /// after it was created.
    pub async fn run(&self, options: &SnapOptions) -> Result<Verdict> {
        let series = series_for_base(&options.base);
        let source = RecipeSource::resolve(
            &options.snap,
            options.git_repo.as_deref(),
            options.git_branch.as_deref(),
        )?;

        let poller = Arc::new(BuildPoller::new(
            &self.config,
            self.launchpad.builds.clone(),
        ));
        let trigger = BuildTrigger::new(
            self.launchpad.recipes.clone(),
            self.launchpad.builds.clone(),
            poller.clone(),
        );

        let recipe = trigger
            .prepare_recipe(&options.snap, &source, series, &options.architectures)
            .await?;

        let result = self
            .build(&trigger, &poller, &recipe, series, options)
            .await;

        if recipe.ephemeral
            && let Err(e) = self.launchpad.recipes.delete_snap(&recipe.snap).await
        {
            println!(
                "WARNING: Could not delete snap recipe {}: {}",
                recipe.snap.name, e
            );
        }

        let verdict = result?;
        if verdict.is_success() {
            println!("Done!");
        }
        Ok(verdict)
    }

    async fn build(
        &self,
        trigger: &BuildTrigger,
        poller: &BuildPoller,
        recipe: &PreparedRecipe,
        series: &str,
        options: &SnapOptions,
    ) -> Result<Verdict> {
        print_point_of_no_return();

        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        println!("Trying to trigger builds at: {}", stamp);

        let snapcraft_channel = options
            .snapcraft_channel
            .clone()
            .filter(|channel| !channel.is_empty())
            .unwrap_or_else(|| default_snapcraft_channel(series).to_string());
        println!(
            "Will build using snapcraft from channel: {}",
            snapcraft_channel
        );

        let target = SnapTarget {
            base: options.base.clone(),
            series: series.to_string(),
            snapcraft_channel,
        };
        let jobs = trigger.trigger_snap(recipe, &target).await?;
        let jobs = poller
            .await_terminal(Probe::Summaries(&recipe.snap), &options.snap, jobs)
            .await;

        let reconciler = Reconciler::new(
            self.launchpad.builds.clone(),
            self.launchpad.files.clone(),
        );
        let reconcile_options = ReconcileOptions {
            snap_name: options.snap.clone(),
            stamp,
            mode: ReconcileMode::Snap {
                ephemeral: recipe.ephemeral,
            },
            results_dir: options.results_dir.clone(),
        };

        Ok(reconciler
            .reconcile(&recipe.snap, &jobs, &reconcile_options)
            .await)
    }
}

const BANNER: [&str; 3] = [
    "!!!!!!! POINT OF NO RETURN !!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!",
    "DO NOT CANCEL THIS JOB AFTER THIS OR BAD THINGS WILL HAPPEN",
    "!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!",
];

/// Builds keep running remotely once requested
fn print_point_of_no_return() {
    for line in BANNER {
        println!("{}", line.red().bold());
    }
}
