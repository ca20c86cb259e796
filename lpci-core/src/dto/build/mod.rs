//! Build DTOs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::build::{BuildJob, BuildState, DEFAULT_ARCH, RequestStatus};

/// A request for builds of every enabled architecture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    pub self_link: String,
    #[serde(default)]
    pub web_link: Option<String>,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub builds_collection_link: Option<String>,
}

impl BuildRequest {
    pub fn status(&self) -> RequestStatus {
        RequestStatus::from_label(&self.status)
    }
}

/// A single snap build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapBuild {
    pub self_link: String,
    #[serde(default)]
    pub web_link: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub buildstate: Option<String>,
    #[serde(default)]
    pub arch_tag: Option<String>,
    #[serde(default)]
    pub build_log_url: Option<String>,
}

impl SnapBuild {
    pub fn state(&self) -> BuildState {
        self.buildstate
            .as_deref()
            .map(BuildState::from_label)
            .unwrap_or(BuildState::Pending)
    }

    /// Domain view of this build
    pub fn to_job(&self) -> BuildJob {
        let arch = self.arch_tag.as_deref().unwrap_or(DEFAULT_ARCH);
        let mut job = BuildJob::new(self.self_link.clone(), arch);
        if let Some(title) = &self.title {
            job.title = title.clone();
        }
        job.web_link = self.web_link.clone();
        job.state = self.state();
        job.log_url = self.build_log_url.clone();
        job
    }
}

/// Status of one build as returned by `getBuildSummaries`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSummary {
    pub status: String,
    #[serde(default)]
    pub build_log_url: Option<String>,
}

impl BuildSummary {
    pub fn state(&self) -> BuildState {
        BuildState::from_label(&self.status)
    }
}

/// Response of `getBuildSummaries`, keyed by build id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSummaries {
    #[serde(default)]
    pub builds: HashMap<String, BuildSummary>,
}

impl BuildSummaries {
    pub fn get(&self, build_id: &str) -> Option<&BuildSummary> {
        self.builds.get(build_id)
    }
}
