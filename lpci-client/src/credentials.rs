//! Launchpad OAuth credentials
//!
//! Credentials are stored in the launchpadlib file format:
//!
//! ```text
//! [1]
//! consumer_key = core-builder
//! consumer_secret =
//! access_token = AbCdEf
//! access_secret = GhIjKl
//! ```
//!
//! Requests are signed with OAuth 1.0 PLAINTEXT, which is what Launchpad
//! expects from API clients.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ClientError, Result};

/// OAuth realm Launchpad signs against
const REALM: &str = "https://api.launchpad.net/";

/// OAuth consumer and access token
#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Credentials for read-only anonymous access
    pub fn anonymous(consumer_key: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: String::new(),
            access_token: String::new(),
            access_secret: String::new(),
        }
    }

    /// Parse the launchpadlib credentials format
    pub fn parse(content: &str) -> Result<Self> {
        let mut consumer_key = None;
        let mut consumer_secret = None;
        let mut access_token = None;
        let mut access_secret = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with('[') {
                continue;
            }
            let Some((key, value)) = line.split_once('=').or_else(|| line.split_once(':')) else {
                continue;
            };
            let value = Some(value.trim().to_string());
            match key.trim() {
                "consumer_key" => consumer_key = value,
                "consumer_secret" => consumer_secret = value,
                "access_token" => access_token = value,
                "access_secret" => access_secret = value,
                _ => {}
            }
        }

        let missing = |field: &str| ClientError::Credentials(format!("missing {field}"));
        Ok(Self {
            consumer_key: consumer_key.ok_or_else(|| missing("consumer_key"))?,
            consumer_secret: consumer_secret.unwrap_or_default(),
            access_token: access_token.ok_or_else(|| missing("access_token"))?,
            access_secret: access_secret.ok_or_else(|| missing("access_secret"))?,
        })
    }

    /// Read a credentials file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ClientError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Value of the `Authorization` header for one request
    pub fn authorization_header(&self) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp();
        self.header_with(&nonce, timestamp)
    }

    fn header_with(&self, nonce: &str, timestamp: i64) -> String {
        let signature = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(&self.access_secret)
        );
        format!(
            "OAuth realm=\"{}\", oauth_consumer_key=\"{}\", oauth_token=\"{}\", \
             oauth_signature_method=\"PLAINTEXT\", oauth_signature=\"{}\", \
             oauth_timestamp=\"{}\", oauth_nonce=\"{}\", oauth_version=\"1.0\"",
            REALM,
            percent_encode(&self.consumer_key),
            percent_encode(&self.access_token),
            percent_encode(&signature),
            timestamp,
            nonce,
        )
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Location of the credentials used for a run
///
/// Credential material handed over through the environment is written to a
/// temporary file that lives as long as this value and is removed on drop.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    _staged: Option<NamedTempFile>,
}

impl CredentialStore {
    /// Use an existing credentials file
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(ClientError::Credentials(format!(
                "{} does not exist",
                path.display()
            )));
        }
        Ok(Self {
            path,
            _staged: None,
        })
    }

    /// Stage credential material in a temporary file
    pub fn from_material(material: &str) -> Result<Self> {
        let mut file = NamedTempFile::new()?;
        file.write_all(material.as_bytes())?;
        file.flush()?;
        debug!("Staged credentials in {}", file.path().display());
        Ok(Self {
            path: file.path().to_path_buf(),
            _staged: Some(file),
        })
    }

    /// Prefer non-empty environment material, fall back to a file
    pub fn from_env_or_path(env_material: Option<&str>, path: impl Into<PathBuf>) -> Result<Self> {
        match env_material {
            Some(material) if !material.is_empty() => {
                debug!("using credentials from LP_CREDENTIALS env var");
                Self::from_material(material)
            }
            _ => {
                debug!("no LP_CREDENTIALS environment variable");
                Self::from_path(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Credentials> {
        Credentials::from_file(&self.path)
    }
}
