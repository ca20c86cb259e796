//! Result reconciler
//!
//! Folds terminal builds into a [`Verdict`] and performs the bookkeeping a
//! finished run needs: failure reports with build logs, artifact downloads
//! for successful builds.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lpci_core::domain::build::{BuildJob, Verdict, arch_from_log_url};
use lpci_core::dto::snap::Snap;
use tracing::{debug, info};

use crate::error::{Result, WorkflowError};
use crate::repository::{BuildRepository, FileRepository};

/// Extension of the files a snap build produces
pub const SNAP_EXTENSION: &str = ".snap";

/// Which workflow's reporting and artifact rules apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Every successful build must ship at least one snap; nothing is
    /// downloaded once a build failed
    Base,
    /// Failures are reported per build; download errors are not fatal
    Snap { ephemeral: bool },
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub snap_name: String,
    /// Timestamp of the trigger, repeated in every report line
    pub stamp: String,
    pub mode: ReconcileMode,
    /// Where artifacts land; created when missing
    pub results_dir: PathBuf,
}

/// Aggregates terminal builds and harvests their output
pub struct Reconciler {
    builds: Arc<dyn BuildRepository>,
    files: Arc<dyn FileRepository>,
}

impl Reconciler {
    pub fn new(builds: Arc<dyn BuildRepository>, files: Arc<dyn FileRepository>) -> Self {
        Self { builds, files }
    }

    /// Classifies `jobs` and performs the reporting and downloads
    ///
    /// Downloads overwrite existing files, so reconciling the same jobs again
    /// yields the same verdict and the same results directory.
    pub async fn reconcile(
        &self,
        snap: &Snap,
        jobs: &[BuildJob],
        options: &ReconcileOptions,
    ) -> Verdict {
        let mut verdict = Verdict::from_jobs(jobs);

        match options.mode {
            ReconcileMode::Base => self.reconcile_base(&mut verdict, options).await,
            ReconcileMode::Snap { ephemeral } => {
                self.reconcile_snap(snap, &mut verdict, options, ephemeral)
                    .await
            }
        }

        info!(
            "{}: {} succeeded, {} failed, {} cancelled",
            options.snap_name,
            verdict.succeeded.len(),
            verdict.failed.len(),
            verdict.cancelled.len()
        );
        verdict
    }

    async fn reconcile_base(&self, verdict: &mut Verdict, options: &ReconcileOptions) {
        for job in verdict.failed.iter().chain(&verdict.cancelled) {
            println!(
                "Error for {}: {} ({})",
                job.title,
                job.state,
                job.web_link.as_deref().unwrap_or("no web link")
            );
        }

        if !verdict.is_success() {
            return;
        }

        for job in &verdict.succeeded {
            if let Err(e) = self.harvest(job, &options.results_dir, true).await {
                println!("{}", e);
                verdict.artifact_errors.push(e.to_string());
                break;
            }
        }
    }

    async fn reconcile_snap(
        &self,
        snap: &Snap,
        verdict: &mut Verdict,
        options: &ReconcileOptions,
        ephemeral: bool,
    ) {
        for job in &verdict.failed {
            let summaries = match self.builds.build_summaries(snap, &[job.id.as_str()]).await {
                Ok(summaries) => summaries,
                Err(e) => {
                    println!(
                        "Could not get failure data for {} (was there an LP timeout?): {}",
                        job.id, e
                    );
                    continue;
                }
            };
            let Some(summary) = summaries.get(&job.id) else {
                println!("Launchpad did not return the build summary for {}", job.id);
                continue;
            };

            let log_url = summary
                .build_log_url
                .as_deref()
                .filter(|url| !url.is_empty());
            let arch = log_url.and_then(arch_from_log_url).unwrap_or("unknown");
            println!(
                "INFO: {} snap {} build at {} failed for id: {} log: {}",
                options.snap_name,
                arch,
                options.stamp,
                job.id,
                log_url.unwrap_or("not available")
            );

            if ephemeral && let Some(url) = log_url {
                self.print_log(url).await;
            }
        }

        for job in &verdict.succeeded {
            // Logs of successful builds are only noise next to a failure
            if verdict.failed.is_empty() {
                self.report_success(snap, job, options, ephemeral).await;
            }

            if let Err(e) = self.harvest(job, &options.results_dir, false).await {
                println!("{}", e);
            }
        }
    }

    async fn report_success(
        &self,
        snap: &Snap,
        job: &BuildJob,
        options: &ReconcileOptions,
        ephemeral: bool,
    ) {
        let summaries = match self.builds.build_summaries(snap, &[job.id.as_str()]).await {
            Ok(summaries) => summaries,
            Err(e) => {
                println!(
                    "Could not get build summary for {} (was there an LP timeout?): {}",
                    job.id, e
                );
                return;
            }
        };

        if let Some(url) = summaries.get(&job.id).and_then(|s| s.build_log_url.as_deref()) {
            println!(
                "INFO: {} snap build at {} successful for id: {} log: {}",
                options.snap_name, options.stamp, job.id, url
            );
            if ephemeral {
                self.print_log(url).await;
            }
        }
    }

    /// Prints a gzip build log inline; ephemeral recipes take their logs with them
    async fn print_log(&self, url: &str) {
        match self.files.fetch_gzip_text(url).await {
            Ok(log) => println!("{}", log),
            Err(e) => println!("Could not fetch build log {}: {}", url, e),
        }
    }

    /// Downloads the snaps a build produced into `dir`
    ///
    /// With `require`, a build without any snap is an error.
    async fn harvest(&self, job: &BuildJob, dir: &Path, require: bool) -> Result<usize> {
        let artifact_error = |source| WorkflowError::Artifact {
            build: job.id.clone(),
            source,
        };
        let urls = self
            .builds
            .file_urls(&job.self_link)
            .await
            .map_err(artifact_error)?;

        if require && urls.is_empty() {
            return Err(WorkflowError::NoBuiltFiles);
        }

        let snaps: Vec<&String> = urls
            .iter()
            .filter(|url| url.ends_with(SNAP_EXTENSION))
            .collect();
        if require && snaps.is_empty() {
            return Err(WorkflowError::NoSnap(job.self_link.clone()));
        }

        std::fs::create_dir_all(dir)?;

        for url in &snaps {
            println!("Downloading snap from {} ...", url);
            let path = dir.join(file_name(url));
            let size = self
                .files
                .download_to(url, &path)
                .await
                .map_err(artifact_error)?;
            debug!("Wrote {} ({} bytes)", path.display(), size);
        }

        Ok(snaps.len())
    }
}

fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
