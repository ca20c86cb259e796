//! Snap recipe DTOs

use serde::{Deserialize, Serialize};

/// A snap recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snap {
    pub self_link: String,
    #[serde(default)]
    pub web_link: Option<String>,
    pub name: String,
    #[serde(default)]
    pub auto_build_archive_link: Option<String>,
    #[serde(default)]
    pub auto_build_pocket: Option<String>,
    /// Channel map such as `{"snapcraft": "stable"}`
    #[serde(default)]
    pub auto_build_channels: Option<serde_json::Value>,
    #[serde(default)]
    pub pending_build_requests_collection_link: Option<String>,
    #[serde(default)]
    pub pending_builds_collection_link: Option<String>,
    #[serde(default)]
    pub processors_collection_link: Option<String>,
    #[serde(default)]
    pub git_path: Option<String>,
    #[serde(default)]
    pub git_repository_url: Option<String>,
}

/// A build processor (architecture)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Processor {
    pub name: String,
    pub self_link: String,
}

/// A distribution series such as `ubuntu/jammy`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistroSeries {
    pub name: String,
    pub self_link: String,
}

/// Parameters for creating a recipe
#[derive(Debug, Clone)]
pub struct NewSnap {
    pub name: String,
    pub owner_link: String,
    pub distro_series_link: String,
    pub git_repository_url: String,
    pub git_path: String,
    pub processor_links: Vec<String>,
    pub auto_build: bool,
}

/// Parameters for a single-architecture build
#[derive(Debug, Clone)]
pub struct BuildParams {
    pub archive_link: String,
    pub distro_arch_series_link: String,
    pub pocket: String,
    /// Channel map, e.g. `{"snapcraft": "latest/stable"}`
    pub channels: serde_json::Value,
    pub snap_base: Option<String>,
}

/// Parameters for a multi-architecture build request using recipe defaults
#[derive(Debug, Clone, Default)]
pub struct BuildsParams {
    pub archive_link: Option<String>,
    pub pocket: Option<String>,
    pub channels: Option<serde_json::Value>,
}

impl From<&Snap> for BuildsParams {
    fn from(snap: &Snap) -> Self {
        Self {
            archive_link: snap.auto_build_archive_link.clone(),
            pocket: snap.auto_build_pocket.clone(),
            channels: snap.auto_build_channels.clone(),
        }
    }
}
