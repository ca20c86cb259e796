//! Launchpad repositories
//!
//! Thin seams over [`LaunchpadClient`] so that services can be exercised
//! against an in-memory service:
//! - Recipes: lookup, lifecycle and build requests
//! - Builds: request status, build status and produced files
//! - Files: downloads of indexes, logs and artifacts

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use lpci_client::{LaunchpadClient, Result};
use lpci_core::domain::build::BuildJob;
use lpci_core::dto::build::{BuildRequest, BuildSummaries, SnapBuild};
use lpci_core::dto::snap::{BuildParams, BuildsParams, DistroSeries, NewSnap, Processor, Snap};

/// Repository trait for snap recipe operations
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Fetches a recipe by link or path
    async fn get_snap(&self, link: &str) -> Result<Snap>;

    /// Looks up a recipe by name and owner link
    async fn find_snap(&self, name: &str, owner_link: &str) -> Result<Option<Snap>>;

    /// Creates a recipe
    async fn create_snap(&self, new: &NewSnap) -> Result<Snap>;

    /// Points a recipe at a git ref
    async fn set_git_path(&self, snap: &Snap, git_path: &str) -> Result<()>;

    /// Deletes a recipe
    async fn delete_snap(&self, snap: &Snap) -> Result<()>;

    /// Build requests not yet processed
    async fn pending_build_requests(&self, snap: &Snap) -> Result<Vec<BuildRequest>>;

    /// Builds not yet finished
    async fn pending_builds(&self, snap: &Snap) -> Result<Vec<SnapBuild>>;

    /// Processors the recipe builds for
    async fn processors(&self, snap: &Snap) -> Result<Vec<Processor>>;

    /// Resolves a processor by architecture name
    async fn processor_by_name(&self, name: &str) -> Result<Processor>;

    /// Resolves an Ubuntu series by codename
    async fn distro_series(&self, codename: &str) -> Result<DistroSeries>;

    /// Link of a series architecture
    fn distro_arch_series_link(&self, codename: &str, arch: &str) -> String;

    /// Link of the primary archive
    fn primary_archive_link(&self) -> String;

    /// Link of a person or team
    fn person_link(&self, name: &str) -> String;

    /// Requests builds for all enabled architectures
    async fn request_builds(&self, snap: &Snap, params: &BuildsParams) -> Result<BuildRequest>;

    /// Requests a build for one architecture
    async fn request_build(&self, snap: &Snap, params: &BuildParams, arch: &str)
    -> Result<BuildJob>;
}

/// Repository trait for build status operations
#[async_trait]
pub trait BuildRepository: Send + Sync {
    /// Re-reads a build request
    async fn get_build_request(&self, link: &str) -> Result<BuildRequest>;

    /// Builds spawned by a completed request
    async fn builds_of(&self, request: &BuildRequest) -> Result<Vec<SnapBuild>>;

    /// Re-reads a single build
    async fn get_build(&self, link: &str) -> Result<SnapBuild>;

    /// Status summaries of builds of a recipe
    async fn build_summaries(&self, snap: &Snap, build_ids: &[&str]) -> Result<BuildSummaries>;

    /// URLs of the files a build produced
    async fn file_urls(&self, build_link: &str) -> Result<Vec<String>>;
}

/// Repository trait for plain downloads
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Downloads a URL into a file, replacing it
    async fn download_to(&self, url: &str, path: &Path) -> Result<u64>;

    /// Downloads and decompresses a gzip text file
    async fn fetch_gzip_text(&self, url: &str) -> Result<String>;
}

/// HTTP implementation of the Launchpad repositories
#[derive(Debug, Clone)]
pub struct HttpLaunchpadRepository {
    client: Arc<LaunchpadClient>,
}

impl HttpLaunchpadRepository {
    /// Creates a new repository over a shared client
    pub fn new(client: Arc<LaunchpadClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecipeRepository for HttpLaunchpadRepository {
    async fn get_snap(&self, link: &str) -> Result<Snap> {
        self.client.get_snap(link).await
    }

    async fn find_snap(&self, name: &str, owner_link: &str) -> Result<Option<Snap>> {
        self.client.find_snap(name, owner_link).await
    }

    async fn create_snap(&self, new: &NewSnap) -> Result<Snap> {
        self.client.create_snap(new).await
    }

    async fn set_git_path(&self, snap: &Snap, git_path: &str) -> Result<()> {
        self.client.set_git_path(snap, git_path).await
    }

    async fn delete_snap(&self, snap: &Snap) -> Result<()> {
        self.client.delete_snap(snap).await
    }

    async fn pending_build_requests(&self, snap: &Snap) -> Result<Vec<BuildRequest>> {
        self.client.pending_build_requests(snap).await
    }

    async fn pending_builds(&self, snap: &Snap) -> Result<Vec<SnapBuild>> {
        self.client.pending_builds(snap).await
    }

    async fn processors(&self, snap: &Snap) -> Result<Vec<Processor>> {
        self.client.processors(snap).await
    }

    async fn processor_by_name(&self, name: &str) -> Result<Processor> {
        self.client.processor_by_name(name).await
    }

    async fn distro_series(&self, codename: &str) -> Result<DistroSeries> {
        self.client.distro_series(codename).await
    }

    fn distro_arch_series_link(&self, codename: &str, arch: &str) -> String {
        self.client.distro_arch_series_link(codename, arch)
    }

    fn primary_archive_link(&self) -> String {
        self.client.primary_archive_link()
    }

    fn person_link(&self, name: &str) -> String {
        self.client.person_link(name)
    }

    async fn request_builds(&self, snap: &Snap, params: &BuildsParams) -> Result<BuildRequest> {
        self.client.request_builds(snap, params).await
    }

    async fn request_build(
        &self,
        snap: &Snap,
        params: &BuildParams,
        arch: &str,
    ) -> Result<BuildJob> {
        self.client.request_build(snap, params, arch).await
    }
}

#[async_trait]
impl BuildRepository for HttpLaunchpadRepository {
    async fn get_build_request(&self, link: &str) -> Result<BuildRequest> {
        self.client.get_build_request(link).await
    }

    async fn builds_of(&self, request: &BuildRequest) -> Result<Vec<SnapBuild>> {
        self.client.request_builds_of(request).await
    }

    async fn get_build(&self, link: &str) -> Result<SnapBuild> {
        self.client.get_build(link).await
    }

    async fn build_summaries(&self, snap: &Snap, build_ids: &[&str]) -> Result<BuildSummaries> {
        self.client.build_summaries(snap, build_ids).await
    }

    async fn file_urls(&self, build_link: &str) -> Result<Vec<String>> {
        self.client.file_urls(build_link).await
    }
}

#[async_trait]
impl FileRepository for HttpLaunchpadRepository {
    async fn download_to(&self, url: &str, path: &Path) -> Result<u64> {
        self.client.download_to(url, path).await
    }

    async fn fetch_gzip_text(&self, url: &str) -> Result<String> {
        self.client.fetch_gzip_text(url).await
    }
}
