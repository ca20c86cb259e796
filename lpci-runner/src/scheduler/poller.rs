//! Build poller
//!
//! Waits for remote work to finish by re-reading it at fixed intervals.
//! Each round queries every job that is not terminal yet, one after the
//! other. A query that fails is logged and the job is simply asked again
//! next round: the remote build keeps going regardless of our view of it.

use std::sync::Arc;

use lpci_core::domain::build::{BuildJob, RequestStatus};
use lpci_core::dto::build::BuildRequest;
use lpci_core::dto::snap::Snap;
use tokio::time::{self, Duration};
use tracing::{debug, info};

use crate::config::Config;
use crate::repository::BuildRepository;

/// How the state of a build is read
#[derive(Debug, Clone, Copy)]
pub enum Probe<'a> {
    /// `getBuildSummaries` on the recipe, one build per call
    Summaries(&'a Snap),
    /// Re-read the build resource itself
    Builds,
}

/// Polls build requests and builds until they settle
pub struct BuildPoller {
    builds: Arc<dyn BuildRepository>,
    request_interval: Duration,
    build_interval: Duration,
}

impl BuildPoller {
    /// Creates a new poller using the configured intervals
    pub fn new(config: &Config, builds: Arc<dyn BuildRepository>) -> Self {
        Self {
            builds,
            request_interval: config.request_poll_interval,
            build_interval: config.build_poll_interval,
        }
    }

    /// Waits until a build request is no longer pending
    ///
    /// The request is always re-read at least once: a freshly created
    /// request reports `Pending` until the service has looked at it.
    pub async fn await_request(&self, request: BuildRequest) -> BuildRequest {
        let mut current = request;

        loop {
            match self.builds.get_build_request(&current.self_link).await {
                Ok(fresh) => current = fresh,
                Err(e) => {
                    println!(
                        "Could not get response for {} (was there an LP timeout?): {}",
                        current.self_link, e
                    );
                }
            }

            if current.status() != RequestStatus::Pending {
                debug!("Build request {} is {}", current.self_link, current.status);
                return current;
            }

            time::sleep(self.request_interval).await;
        }
    }

    /// Polls until every job is terminal
    ///
    /// Terminal jobs are never queried again. There is no overall timeout.
    pub async fn await_terminal(
        &self,
        probe: Probe<'_>,
        snap_name: &str,
        mut jobs: Vec<BuildJob>,
    ) -> Vec<BuildJob> {
        info!(
            "Polling {} build(s) of {} every {:?}",
            jobs.len(),
            snap_name,
            self.build_interval
        );

        loop {
            for job in jobs.iter_mut().filter(|job| !job.is_terminal()) {
                if let Err(e) = self.refresh(probe, job).await {
                    println!(
                        "Could not get response for {} (was there an LP timeout?): {}",
                        job.id, e
                    );
                    continue;
                }

                if job.state.is_cancelled() {
                    println!(
                        "INFO: {} snap build was canceled for id: {}",
                        snap_name, job.id
                    );
                }
            }

            let waiting = jobs.iter().filter(|job| !job.is_terminal()).count();
            if waiting == 0 {
                return jobs;
            }

            debug!("{} build(s) of {} still running", waiting, snap_name);
            time::sleep(self.build_interval).await;
        }
    }

    async fn refresh(&self, probe: Probe<'_>, job: &mut BuildJob) -> lpci_client::Result<()> {
        match probe {
            Probe::Summaries(snap) => {
                let summaries = self.builds.build_summaries(snap, &[job.id.as_str()]).await?;
                let summary = summaries.get(&job.id).ok_or_else(|| {
                    lpci_client::ClientError::ParseError(format!(
                        "no summary returned for build {}",
                        job.id
                    ))
                })?;
                job.observe(summary.state(), summary.build_log_url.clone());
            }
            Probe::Builds => {
                let build = self.builds.get_build(&job.self_link).await?;
                if let Some(title) = &build.title {
                    job.title = title.clone();
                }
                if build.web_link.is_some() {
                    job.web_link = build.web_link.clone();
                }
                job.observe(build.state(), build.build_log_url.clone());
            }
        }

        debug!("Build {} ({}) is {}", job.id, job.arch, job.state);
        Ok(())
    }
}
