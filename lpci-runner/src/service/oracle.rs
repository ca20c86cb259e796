//! Package-version oracle
//!
//! Downloads package indexes and folds them into a single map holding the
//! highest version of every package across all of them.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use lpci_core::domain::series::IndexSource;
use lpci_core::domain::version_map::PackageVersionMap;
use lpci_core::index::PackageIndexReader;
use tracing::{debug, info, warn};

use crate::error::{Result, WorkflowError};
use crate::repository::FileRepository;

/// Computes the latest version of every package offered by a set of indexes
pub struct VersionOracle {
    files: Arc<dyn FileRepository>,
    attempts: u32,
}

impl VersionOracle {
    /// Creates an oracle that tries each download `attempts` times
    pub fn new(files: Arc<dyn FileRepository>, attempts: u32) -> Self {
        Self {
            files,
            attempts: attempts.max(1),
        }
    }

    /// Downloads every source into `scratch` and merges them in order
    pub async fn compute_latest_versions(
        &self,
        sources: &[IndexSource],
        scratch: &Path,
    ) -> Result<PackageVersionMap> {
        let mut versions = PackageVersionMap::new();

        for source in sources {
            let path = scratch.join(&source.file_name);
            self.download_with_retry(&source.url, &path).await?;

            let merged = merge_index(&mut versions, &path)?;
            debug!("{}: {} records", source.file_name, merged);
        }

        info!(
            "Indexed {} packages from {} sources",
            versions.len(),
            sources.len()
        );
        Ok(versions)
    }

    async fn download_with_retry(&self, url: &str, path: &Path) -> Result<()> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            println!("downloading {}", url);

            match self.files.download_to(url, path).await {
                Ok(_) => return Ok(()),
                Err(e) if attempt < self.attempts => {
                    println!("{}", e);
                    println!("retrying");
                    warn!("Download of {} failed (attempt {}/{})", url, attempt, self.attempts);
                }
                Err(e) => {
                    return Err(WorkflowError::Fetch {
                        url: url.to_string(),
                        source: e,
                    });
                }
            }
        }
    }
}

/// Merges a gzip compressed package index into `versions`
///
/// Indexes made of several concatenated gzip members are read in full.
pub fn merge_index(versions: &mut PackageVersionMap, path: &Path) -> Result<usize> {
    let reader = BufReader::new(MultiGzDecoder::new(File::open(path)?));
    Ok(versions.merge_records(PackageIndexReader::new(reader))?)
}
