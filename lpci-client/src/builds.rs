//! Build request and build endpoints

use lpci_core::dto::build::{BuildRequest, SnapBuild};

use crate::error::Result;
use crate::{LaunchpadClient, NamedArgs};

impl LaunchpadClient {
    /// Get a build request by link
    pub async fn get_build_request(&self, link: &str) -> Result<BuildRequest> {
        self.get_object(link).await
    }

    /// Builds spawned by a completed build request
    ///
    /// # Returns
    /// An empty list while the request has not produced builds yet
    pub async fn request_builds_of(&self, request: &BuildRequest) -> Result<Vec<SnapBuild>> {
        match &request.builds_collection_link {
            Some(link) => self.get_collection(link).await,
            None => Ok(Vec::new()),
        }
    }

    /// Get a single build by link
    pub async fn get_build(&self, link: &str) -> Result<SnapBuild> {
        self.get_object(link).await
    }

    /// URLs of the files a build produced
    pub async fn file_urls(&self, build_link: &str) -> Result<Vec<String>> {
        let response = self
            .named_get(build_link, &NamedArgs::op("getFileUrls"))
            .send()
            .await?;

        self.handle_response(response).await
    }
}
