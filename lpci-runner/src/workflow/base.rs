//! Base image workflow
//!
//! Checks whether a base snap (`core`, `core18`, ...) needs a rebuild and,
//! when it does, tags HEAD, builds every architecture with the recipe
//! defaults and downloads the produced snaps. A failed run removes its tag
//! so that the next run tries again.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use lpci_core::domain::build::Verdict;
use lpci_core::domain::policy::Exclusions;
use lpci_core::domain::series::CoreSeries;
use lpci_core::domain::tag::BuildTag;
use tracing::info;

use crate::config::Config;
use crate::error::{Result, WorkflowError};
use crate::repository::{ManifestSource, VcsRepository};
use crate::scheduler::{BuildPoller, Probe};
use crate::service::{
    BuildTrigger, ChangeDetector, GitTagPolicy, PackageDriftPolicy, ReconcileMode,
    ReconcileOptions, Reconciler, TriggerOutcome, VersionOracle, remove_build_tag,
};
use crate::workflow::LaunchpadRepositories;

/// Parses the series argument (`""`, `"18"`, `"20"`, ...)
pub fn parse_series(arg: &str) -> Result<CoreSeries> {
    CoreSeries::from_arg(arg).ok_or_else(|| WorkflowError::InvalidSeries {
        given: arg.to_string(),
        valid: CoreSeries::supported_args(),
    })
}

#[derive(Debug, Clone)]
pub struct BaseOptions {
    pub series: CoreSeries,
    /// Report what would be built without tagging or building
    pub dry_run: bool,
    /// Whether a build tag on HEAD counts as "already built"
    pub git_check: bool,
    /// Where built snaps are downloaded
    pub output_dir: PathBuf,
}

/// How a base workflow run ended
#[derive(Debug)]
pub enum BaseOutcome {
    /// A build was already pending or running
    Skipped,
    /// No policy asked for a build
    Unchanged,
    DryRun(BuildTag),
    Built(Verdict),
}

impl BaseOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Built(verdict) if !verdict.is_success() => 1,
            _ => 0,
        }
    }
}

/// Rebuilds a base image when it is out of date
pub struct BaseWorkflow {
    config: Config,
    launchpad: LaunchpadRepositories,
    vcs: Arc<dyn VcsRepository>,
    manifests: Arc<dyn ManifestSource>,
    today: Option<NaiveDate>,
}

impl BaseWorkflow {
    pub fn new(
        config: Config,
        launchpad: LaunchpadRepositories,
        vcs: Arc<dyn VcsRepository>,
        manifests: Arc<dyn ManifestSource>,
    ) -> Self {
        Self {
            config,
            launchpad,
            vcs,
            manifests,
            today: None,
        }
    }

    /// Fixes the date build tags are minted for
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub async fn run(&self, options: &BaseOptions) -> Result<BaseOutcome> {
        let series = options.series;
        let base = series.snap_name();
        println!("Checking {}", base);

        let recipe_link = format!("{}/{}", self.config.api_root, series.recipe_path());
        println!("building snap recipe {}", recipe_link);
        let snap = self.launchpad.recipes.get_snap(&recipe_link).await?;

        let poller = Arc::new(BuildPoller::new(
            &self.config,
            self.launchpad.builds.clone(),
        ));
        let trigger = BuildTrigger::new(
            self.launchpad.recipes.clone(),
            self.launchpad.builds.clone(),
            poller.clone(),
        );

        if trigger.is_build_running(&snap).await? {
            return Ok(BaseOutcome::Skipped);
        }

        let branch = self.vcs.current_branch()?;
        let scratch = tempfile::tempdir()?;

        let mut detector = ChangeDetector::new();
        if options.git_check {
            detector = detector.with_policy(GitTagPolicy::new(self.vcs.clone(), branch.clone()));
        }
        detector = detector.with_policy(PackageDriftPolicy::new(
            base.clone(),
            self.manifests.clone(),
            VersionOracle::new(self.launchpad.files.clone(), self.config.download_attempts),
            series.index_sources(),
            Exclusions::for_series(series),
            scratch.path(),
        ));

        let decision = detector.decide().await?;
        if !decision.should_build() {
            info!("{} is up to date", base);
            return Ok(BaseOutcome::Unchanged);
        }

        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let outcome = trigger
            .trigger_base(&snap, self.vcs.as_ref(), &branch, today, options.dry_run)
            .await?;

        let (jobs, tag) = match outcome {
            TriggerOutcome::Skipped => return Ok(BaseOutcome::Skipped),
            TriggerOutcome::DryRun { tag } => return Ok(BaseOutcome::DryRun(tag)),
            TriggerOutcome::Requested { jobs, tag } => (jobs, tag),
        };

        let jobs = poller.await_terminal(Probe::Builds, &snap.name, jobs).await;

        let reconciler = Reconciler::new(
            self.launchpad.builds.clone(),
            self.launchpad.files.clone(),
        );
        let reconcile_options = ReconcileOptions {
            snap_name: snap.name.clone(),
            stamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            mode: ReconcileMode::Base,
            results_dir: options.output_dir.clone(),
        };
        let verdict = reconciler.reconcile(&snap, &jobs, &reconcile_options).await;

        if !verdict.is_success()
            && let Some(tag) = &tag
        {
            remove_build_tag(self.vcs.as_ref(), &tag.to_string())?;
        }

        Ok(BaseOutcome::Built(verdict))
    }
}
