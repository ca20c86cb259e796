//! Plain file downloads
//!
//! Mirror indexes, build logs and artifacts are served outside the web
//! service, so these requests never carry the OAuth header.

use std::io::Read;
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::LaunchpadClient;
use crate::error::{ClientError, Result};

impl LaunchpadClient {
    /// Fetch a URL into memory
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Downloading {}", url);
        let response = self.client.get(url).send().await?;
        let response = self.check_status(response).await?;

        Ok(response.bytes().await?.to_vec())
    }

    /// Stream a URL into a file, replacing any existing one
    ///
    /// # Returns
    /// The number of bytes written
    pub async fn download_to(&self, url: &str, path: &Path) -> Result<u64> {
        debug!("Downloading {} to {}", url, path.display());
        let response = self.client.get(url).send().await?;
        let mut response = self.check_status(response).await?;

        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    /// Fetch a gzip compressed text file such as a build log
    pub async fn fetch_gzip_text(&self, url: &str) -> Result<String> {
        let bytes = self.fetch_bytes(url).await?;
        gunzip_text(&bytes)
    }
}

/// Decompress gzip data into text, replacing invalid UTF-8
///
/// Concatenated gzip members are all decoded.
pub fn gunzip_text(bytes: &[u8]) -> Result<String> {
    let mut decoded = Vec::new();
    MultiGzDecoder::new(bytes)
        .read_to_end(&mut decoded)
        .map_err(|e| ClientError::ParseError(format!("invalid gzip stream: {}", e)))?;
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}
