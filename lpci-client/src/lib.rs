//! Launchpad HTTP Client
//!
//! A small, typed client for the parts of the Launchpad web service API used
//! to drive snap builds: snap recipes, build requests, builds and the
//! librarian files they produce.
//!
//! Launchpad objects refer to each other by absolute links (`self_link`,
//! `*_collection_link`), so most methods take a link rather than an id.
//!
//! # Example
//!
//! ```no_run
//! use lpci_client::{Credentials, LaunchpadClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lpci_client::ClientError> {
//!     let credentials = Credentials::from_file(std::path::Path::new(".lp_credentials"))?;
//!     let client = LaunchpadClient::new(lpci_client::DEFAULT_API_ROOT, Some(credentials));
//!
//!     let snap = client.get_snap("~ubuntu-core-service/+snap/core22").await?;
//!     println!("Recipe: {}", snap.self_link);
//!     Ok(())
//! }
//! ```

mod builds;
pub mod credentials;
mod distro;
mod download;
pub mod error;
mod snaps;

// Re-export commonly used types
pub use credentials::{CredentialStore, Credentials};
pub use download::gunzip_text;
pub use error::{ClientError, Result};

use std::time::Duration;

use lpci_core::dto::collection::Collection;
use reqwest::header::{ACCEPT, AUTHORIZATION, LOCATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

/// Root of the production web service, `devel` flavour
pub const DEFAULT_API_ROOT: &str = "https://api.launchpad.net/devel";

/// Arguments of a named operation (`ws.op`)
///
/// Text values are sent as-is, everything else is JSON encoded, which is how
/// the web service expects lists, maps and numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedArgs {
    pairs: Vec<(String, String)>,
}

impl NamedArgs {
    pub fn op(name: &str) -> Self {
        Self {
            pairs: vec![("ws.op".to_string(), name.to_string())],
        }
    }

    pub fn text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.pairs.push((key.to_string(), value.into()));
        self
    }

    pub fn json(mut self, key: &str, value: &serde_json::Value) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a text argument only when present
    pub fn maybe_text(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.text(key, value),
            None => self,
        }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// HTTP client for the Launchpad web service
///
/// Methods are grouped by the objects they act on:
/// - Snap recipes (lookup, create, update, delete, request builds)
/// - Build requests and builds (status, summaries, files)
/// - Distribution objects (series, processors, archives, people)
/// - Plain downloads of mirror indexes, logs and artifacts
#[derive(Debug, Clone)]
pub struct LaunchpadClient {
    /// Service root, e.g. "https://api.launchpad.net/devel"
    api_root: String,
    /// HTTP client instance
    client: Client,
    /// Absent for anonymous, read-only access
    credentials: Option<Credentials>,
}

impl LaunchpadClient {
    /// Create a new Launchpad client
    ///
    /// # Example
    /// ```
    /// use lpci_client::LaunchpadClient;
    ///
    /// let client = LaunchpadClient::new("https://api.launchpad.net/devel", None);
    /// ```
    pub fn new(api_root: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self::with_client(api_root, Client::new(), credentials)
    }

    /// Create a client whose requests fail only when the connection stalls
    ///
    /// `timeout` bounds connecting and every single read, never the whole
    /// transfer, so large artifacts can take as long as they need.
    pub fn with_idle_timeout(
        api_root: impl Into<String>,
        timeout: Duration,
        credentials: Option<Credentials>,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;
        Ok(Self::with_client(api_root, client, credentials))
    }

    /// Create a new Launchpad client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        api_root: impl Into<String>,
        client: Client,
        credentials: Option<Credentials>,
    ) -> Self {
        let api_root = api_root.into();
        Self {
            api_root: api_root.trim_end_matches('/').to_string(),
            client,
            credentials,
        }
    }

    /// Get the service root
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Turn a link or a root-relative path into an absolute URL
    pub fn resolve(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}/{}", self.api_root, link.trim_start_matches('/'))
        }
    }

    // =============================================================================
    // Request Builders
    // =============================================================================

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(ACCEPT, "application/json");
        match &self.credentials {
            Some(credentials) => builder.header(AUTHORIZATION, credentials.authorization_header()),
            None => builder,
        }
    }

    fn get(&self, link: &str) -> RequestBuilder {
        let url = self.resolve(link);
        trace!("GET {}", url);
        self.authorize(self.client.get(url))
    }

    fn named_get(&self, link: &str, args: &NamedArgs) -> RequestBuilder {
        self.get(link).query(args.pairs())
    }

    fn named_post(&self, link: &str, args: &NamedArgs) -> RequestBuilder {
        let url = self.resolve(link);
        debug!("POST {} ({:?})", url, args.pairs().first().map(|(_, op)| op));
        self.authorize(self.client.post(url)).form(args.pairs())
    }

    fn patch(&self, link: &str, body: &serde_json::Value) -> RequestBuilder {
        let url = self.resolve(link);
        debug!("PATCH {}", url);
        self.authorize(self.client.patch(url)).json(body)
    }

    fn delete(&self, link: &str) -> RequestBuilder {
        let url = self.resolve(link);
        debug!("DELETE {}", url);
        self.authorize(self.client.delete(url))
    }

    // =============================================================================
    // Generic Reads
    // =============================================================================

    /// Fetch any object by link
    pub async fn get_object<T: DeserializeOwned>(&self, link: &str) -> Result<T> {
        let response = self.get(link).send().await?;
        self.handle_response(response).await
    }

    /// Fetch every entry of a collection, following pagination
    pub async fn get_collection<T: DeserializeOwned>(&self, link: &str) -> Result<Vec<T>> {
        let mut entries = Vec::new();
        let mut next = Some(link.to_string());

        while let Some(link) = next {
            let response = self.get(&link).send().await?;
            let page: Collection<T> = self.handle_response(response).await?;
            entries.extend(page.entries);
            next = page.next_collection_link;
        }

        Ok(entries)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(response.url().to_string()));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        self.check_status(response).await?;
        Ok(())
    }

    /// Handle the response of an operation that creates an object
    ///
    /// Launchpad answers `201 Created` with the new object's link in the
    /// `Location` header.
    async fn handle_created(&self, response: reqwest::Response) -> Result<String> {
        let url = response.url().to_string();
        let response = self.check_status(response).await?;

        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(ClientError::MissingLocation(url))
    }
}
