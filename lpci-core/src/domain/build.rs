//! Build domain types
//!
//! A build moves through remote states that this client only observes by
//! polling. Launchpad reports them in two vocabularies: human labels on
//! build resources (`buildstate`) and enum names in build summaries
//! (`status`). Both parse into [`BuildState`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Architecture recorded for builds requested without one
pub const DEFAULT_ARCH: &str = "default";

/// State of a remote build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildState {
    Pending,
    NeedsBuilding,
    DependencyWait,
    Building,
    Uploading,
    Cancelling,
    Gathering,
    FullyBuilt,
    Cancelled,
    /// Any failure, carrying the label the service reported
    Failed(String),
}

impl BuildState {
    /// Interpret a `buildstate` label or a build-summary status
    ///
    /// Unknown values are treated as failures so that polling terminates.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Pending" | "PENDING" => Self::Pending,
            "Needs building" | "NEEDSBUILD" => Self::NeedsBuilding,
            "Dependency wait" | "MANUALDEPWAIT" => Self::DependencyWait,
            "Currently building" | "BUILDING" => Self::Building,
            "Uploading build" | "UPLOADING" => Self::Uploading,
            "Cancelling build" | "CANCELLING" => Self::Cancelling,
            "Gathering build output" | "GATHERING" => Self::Gathering,
            "Successfully built" | "FULLYBUILT" => Self::FullyBuilt,
            "Cancelled build" | "CANCELLED" => Self::Cancelled,
            other => Self::Failed(other.to_string()),
        }
    }

    /// Human label as shown by Launchpad
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::NeedsBuilding => "Needs building",
            Self::DependencyWait => "Dependency wait",
            Self::Building => "Currently building",
            Self::Uploading => "Uploading build",
            Self::Cancelling => "Cancelling build",
            Self::Gathering => "Gathering build output",
            Self::FullyBuilt => "Successfully built",
            Self::Cancelled => "Cancelled build",
            Self::Failed(label) => label,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FullyBuilt | Self::Cancelled | Self::Failed(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::FullyBuilt)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Whether a recipe with a build in this state counts as busy
    pub fn blocks_new_builds(&self) -> bool {
        matches!(self, Self::NeedsBuilding | Self::Building)
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status of a build request
///
/// A request is accepted immediately but only turns into builds once the
/// service has processed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Failed,
    Completed,
}

impl RequestStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Pending" => Self::Pending,
            "Completed" => Self::Completed,
            _ => Self::Failed,
        }
    }
}

/// One in-flight remote build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildJob {
    /// Build id, the last path segment of the API link
    pub id: String,
    /// Architecture tag, or [`DEFAULT_ARCH`]
    pub arch: String,
    /// API link of the build resource
    pub self_link: String,
    /// Browsable link, when the service returned one
    pub web_link: Option<String>,
    pub title: String,
    pub state: BuildState,
    /// Build log location, once known
    pub log_url: Option<String>,
}

impl BuildJob {
    /// Create a job for a freshly accepted build
    pub fn new(self_link: impl Into<String>, arch: impl Into<String>) -> Self {
        let self_link = self_link.into();
        let id = build_id_from_link(&self_link).to_string();
        Self {
            title: id.clone(),
            id,
            arch: arch.into(),
            self_link,
            web_link: None,
            state: BuildState::Pending,
            log_url: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Record a polled state
    ///
    /// Terminal jobs are frozen; returns whether the job changed.
    pub fn observe(&mut self, state: BuildState, log_url: Option<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        let changed = self.state != state || (log_url.is_some() && self.log_url != log_url);
        self.state = state;
        if log_url.is_some() {
            self.log_url = log_url;
        }
        changed
    }
}

/// Extract the id from a build link such as `.../+build/1234`
pub fn build_id_from_link(link: &str) -> &str {
    link.trim_end_matches('/').rsplit('/').next().unwrap_or(link)
}

/// Best-effort architecture from a build log URL
///
/// Log names look like `buildlog_snap_ubuntu_jammy_arm64_name_BUILDING.txt.gz`;
/// the architecture is the fifth `_`-separated field.
pub fn arch_from_log_url(log_url: &str) -> Option<&str> {
    log_url.split('_').nth(4).filter(|part| !part.is_empty())
}

/// Terminal jobs sorted by outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub succeeded: Vec<BuildJob>,
    pub failed: Vec<BuildJob>,
    pub cancelled: Vec<BuildJob>,
    /// Problems harvesting artifacts from successful builds
    pub artifact_errors: Vec<String>,
}

impl Verdict {
    /// Classify terminal jobs; non-terminal jobs are counted as failed
    pub fn from_jobs(jobs: &[BuildJob]) -> Self {
        let mut verdict = Self::default();
        for job in jobs {
            match &job.state {
                BuildState::FullyBuilt => verdict.succeeded.push(job.clone()),
                BuildState::Cancelled => verdict.cancelled.push(job.clone()),
                _ => verdict.failed.push(job.clone()),
            }
        }
        verdict
    }

    /// Overall CI outcome
    ///
    /// Cancelled builds are reported but do not fail the run on their own.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.artifact_errors.is_empty()
    }
}
