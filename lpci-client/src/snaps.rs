//! Snap recipe endpoints

use lpci_core::domain::build::BuildJob;
use lpci_core::dto::build::{BuildRequest, BuildSummaries, SnapBuild};
use lpci_core::dto::snap::{BuildParams, BuildsParams, NewSnap, Processor, Snap};
use serde_json::json;
use tracing::info;

use crate::error::{ClientError, Result};
use crate::{LaunchpadClient, NamedArgs};

impl LaunchpadClient {
    // =============================================================================
    // Recipe Lifecycle
    // =============================================================================

    /// Get a snap recipe
    ///
    /// # Arguments
    /// * `link` - Recipe link or path, e.g. `~ubuntu-core-service/+snap/core22`
    pub async fn get_snap(&self, link: &str) -> Result<Snap> {
        self.get_object(link).await
    }

    /// Look up a recipe by owner and name
    ///
    /// # Returns
    /// `None` when the owner has no recipe of that name
    pub async fn find_snap(&self, name: &str, owner_link: &str) -> Result<Option<Snap>> {
        let args = NamedArgs::op("getByName")
            .text("name", name)
            .text("owner", owner_link);
        let response = self.named_get("+snaps", &args).send().await?;

        match self.handle_response(response).await {
            Ok(snap) => Ok(Some(snap)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create a snap recipe
    ///
    /// # Returns
    /// The recipe as stored by Launchpad
    pub async fn create_snap(&self, new: &NewSnap) -> Result<Snap> {
        let args = NamedArgs::op("new")
            .text("name", &new.name)
            .text("owner", &new.owner_link)
            .text("distro_series", &new.distro_series_link)
            .text("git_repository_url", &new.git_repository_url)
            .text("git_path", &new.git_path)
            .json("processors", &json!(new.processor_links))
            .json("auto_build", &json!(new.auto_build));
        let response = self.named_post("+snaps", &args).send().await?;
        let link = self.handle_created(response).await?;

        info!("Created snap recipe {}", link);
        self.get_snap(&link).await
    }

    /// Point a recipe at another git ref
    pub async fn set_git_path(&self, snap: &Snap, git_path: &str) -> Result<()> {
        let response = self
            .patch(&snap.self_link, &json!({ "git_path": git_path }))
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Delete a recipe
    pub async fn delete_snap(&self, snap: &Snap) -> Result<()> {
        let response = self.delete(&snap.self_link).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Recipe Collections
    // =============================================================================

    /// Build requests of a recipe that have not completed yet
    pub async fn pending_build_requests(&self, snap: &Snap) -> Result<Vec<BuildRequest>> {
        match &snap.pending_build_requests_collection_link {
            Some(link) => self.get_collection(link).await,
            None => Ok(Vec::new()),
        }
    }

    /// Builds of a recipe that have not finished yet
    pub async fn pending_builds(&self, snap: &Snap) -> Result<Vec<SnapBuild>> {
        match &snap.pending_builds_collection_link {
            Some(link) => self.get_collection(link).await,
            None => Ok(Vec::new()),
        }
    }

    /// Processors a recipe is enabled for
    pub async fn processors(&self, snap: &Snap) -> Result<Vec<Processor>> {
        match &snap.processors_collection_link {
            Some(link) => self.get_collection(link).await,
            None => Ok(Vec::new()),
        }
    }

    // =============================================================================
    // Requesting Builds
    // =============================================================================

    /// Request builds for every architecture the recipe is enabled for
    ///
    /// # Returns
    /// The build request, which spawns builds asynchronously
    pub async fn request_builds(&self, snap: &Snap, params: &BuildsParams) -> Result<BuildRequest> {
        let archive = params
            .archive_link
            .as_deref()
            .ok_or_else(|| ClientError::ParseError("recipe has no auto_build_archive".into()))?;
        let pocket = params
            .pocket
            .as_deref()
            .ok_or_else(|| ClientError::ParseError("recipe has no auto_build_pocket".into()))?;

        let mut args = NamedArgs::op("requestBuilds")
            .text("archive", archive)
            .text("pocket", pocket);
        if let Some(channels) = &params.channels {
            args = args.json("channels", channels);
        }

        let response = self.named_post(&snap.self_link, &args).send().await?;
        let link = self.handle_created(response).await?;

        self.get_build_request(&link).await
    }

    /// Request a build for one architecture
    ///
    /// # Returns
    /// The new build as a job in its initial state
    pub async fn request_build(&self, snap: &Snap, params: &BuildParams, arch: &str) -> Result<BuildJob> {
        let args = NamedArgs::op("requestBuild")
            .text("archive", &params.archive_link)
            .text("distro_arch_series", &params.distro_arch_series_link)
            .text("pocket", &params.pocket)
            .json("channels", &params.channels)
            .maybe_text("snap_base", params.snap_base.as_deref());

        let response = self.named_post(&snap.self_link, &args).send().await?;
        let link = self.handle_created(response).await?;

        Ok(BuildJob::new(link, arch))
    }

    /// Status summaries for a set of builds of a recipe
    pub async fn build_summaries(&self, snap: &Snap, build_ids: &[&str]) -> Result<BuildSummaries> {
        let args = NamedArgs::op("getBuildSummaries").json("build_ids", &build_ids_json(build_ids));
        let response = self.named_get(&snap.self_link, &args).send().await?;

        self.handle_response(response).await
    }
}

/// Build ids are integers on the wire
fn build_ids_json(ids: &[&str]) -> serde_json::Value {
    ids.iter()
        .map(|id| match id.parse::<u64>() {
            Ok(n) => json!(n),
            Err(_) => json!(id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ids_are_numeric() {
        assert_eq!(build_ids_json(&["11", "12"]).to_string(), "[11,12]");
        assert_eq!(build_ids_json(&["odd"]).to_string(), r#"["odd"]"#);
    }
}
