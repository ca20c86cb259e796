//! Workflow errors

use lpci_client::ClientError;
use thiserror::Error;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that stop a workflow
///
/// A failed build is not one of them: it is reported through the verdict so
/// that logs and artifacts are still harvested.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A download still failed after every attempt
    #[error("failed to download {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: ClientError,
    },

    /// Package index or manifest content was malformed
    #[error(transparent)]
    Parse(#[from] lpci_core::Error),

    /// Inputs are inconsistent or incomplete
    #[error("{0}")]
    Configuration(String),

    /// Every requested architecture was filtered out
    #[error("no architectures left to build for {0}")]
    NoArchitectures(String),

    /// Unknown core series argument
    #[error("unsupported core series '{given}', valid values are: {valid}")]
    InvalidSeries { given: String, valid: String },

    /// The service rejected a build request
    #[error("build request for {snap} failed: {message}")]
    RequestFailed { snap: String, message: String },

    /// A git command failed
    #[error("git {command} failed: {message}")]
    Vcs { command: String, message: String },

    /// An external tool such as `snap` or `unsquashfs` failed
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    /// Files of a finished build could not be listed or downloaded
    #[error("Could not retrieve snap build data for {build} (was there an LP timeout?): {source}")]
    Artifact {
        build: String,
        #[source]
        source: ClientError,
    },

    /// A successful build published no files
    #[error("ERROR: no built files found")]
    NoBuiltFiles,

    /// A successful build published files but no snap
    #[error("No snap found after finishing build in {0}")]
    NoSnap(String),

    /// Launchpad call failed
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
