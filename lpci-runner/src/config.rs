//! Runner configuration
//!
//! Defines the tunables of a workflow run: where the Launchpad API lives,
//! how often remote state is polled and how hard downloads are retried.

use std::time::Duration;

use lpci_client::{Credentials, DEFAULT_API_ROOT, LaunchpadClient};

use crate::error::{Result, WorkflowError};

/// Runner configuration
///
/// Poll intervals are configurable so that tests and staging setups can run
/// the workflows without waiting on production timings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Launchpad service root (e.g., "https://api.launchpad.net/devel")
    pub api_root: String,

    /// How often a pending build request is re-read
    pub request_poll_interval: Duration,

    /// How long to sleep between build polling rounds
    pub build_poll_interval: Duration,

    /// Attempts per package index download
    pub download_attempts: u32,

    /// How long a connection may stall while connecting or reading
    pub http_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(api_root: String) -> Self {
        Self {
            api_root,
            request_poll_interval: Duration::from_secs(10),
            build_poll_interval: Duration::from_secs(60),
            download_attempts: 3,
            http_timeout: Duration::from_secs(60),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables, all optional:
    /// - LPCI_API_ROOT (default: https://api.launchpad.net/devel)
    /// - LPCI_REQUEST_POLL_SECS (default: 10)
    /// - LPCI_BUILD_POLL_SECS (default: 60)
    /// - LPCI_HTTP_TIMEOUT_SECS (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_root = std::env::var("LPCI_API_ROOT").unwrap_or(defaults.api_root);

        let request_poll_interval = env_secs("LPCI_REQUEST_POLL_SECS")
            .unwrap_or(defaults.request_poll_interval);

        let build_poll_interval =
            env_secs("LPCI_BUILD_POLL_SECS").unwrap_or(defaults.build_poll_interval);

        let http_timeout = env_secs("LPCI_HTTP_TIMEOUT_SECS").unwrap_or(defaults.http_timeout);

        Self {
            api_root,
            request_poll_interval,
            build_poll_interval,
            download_attempts: defaults.download_attempts,
            http_timeout,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_root.is_empty() {
            return Err(WorkflowError::configuration("api_root cannot be empty"));
        }

        if !self.api_root.starts_with("http://") && !self.api_root.starts_with("https://") {
            return Err(WorkflowError::configuration(
                "api_root must start with http:// or https://",
            ));
        }

        if self.request_poll_interval.is_zero() {
            return Err(WorkflowError::configuration(
                "request_poll_interval must be greater than 0",
            ));
        }

        if self.build_poll_interval.is_zero() {
            return Err(WorkflowError::configuration(
                "build_poll_interval must be greater than 0",
            ));
        }

        if self.download_attempts == 0 {
            return Err(WorkflowError::configuration(
                "download_attempts must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Builds a Launchpad client whose connections time out after
    /// `http_timeout` without progress
    pub fn launchpad_client(&self, credentials: Option<Credentials>) -> Result<LaunchpadClient> {
        Ok(LaunchpadClient::with_idle_timeout(
            self.api_root.clone(),
            self.http_timeout,
            credentials,
        )?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_API_ROOT.to_string())
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}
