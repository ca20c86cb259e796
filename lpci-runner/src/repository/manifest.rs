//! Manifest source
//!
//! The installed-package list of a base is read from its latest edge
//! revision in the store: the snap is downloaded with `snap download` and
//! only `dpkg.yaml` is extracted from the squashfs image.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use lpci_core::domain::manifest::{DPKG_MANIFEST_PATH, Manifest};
use tracing::{debug, info};

use crate::error::{Result, WorkflowError};

/// Source of a base snap's package manifest
pub trait ManifestSource: Send + Sync {
    /// Fetches the manifest of `base` (e.g. `core22`), unpacking into `work_dir`
    fn fetch_manifest(&self, base: &str, work_dir: &Path) -> Result<Manifest>;
}

/// Reads manifests from edge snaps downloaded from the store
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreManifestSource;

impl StoreManifestSource {
    pub fn new() -> Self {
        Self
    }

    fn download(&self, base: &str, work_dir: &Path) -> Result<PathBuf> {
        let target = work_dir.to_string_lossy().into_owned();
        run(
            "snap download",
            Command::new("snap").args([
                "download",
                "--edge",
                "--basename",
                base,
                "--target-directory",
                &target,
                base,
            ]),
        )?;
        Ok(work_dir.join(format!("{base}.snap")))
    }

    fn extract(&self, base: &str, snap: &Path, work_dir: &Path) -> Result<PathBuf> {
        let unpack_dir = work_dir.join(base);
        run(
            "unsquashfs",
            Command::new("unsquashfs")
                .arg("-d")
                .arg(&unpack_dir)
                .arg(snap)
                .arg(DPKG_MANIFEST_PATH)
                .stdout(Stdio::null()),
        )?;
        Ok(unpack_dir.join(DPKG_MANIFEST_PATH))
    }
}

impl ManifestSource for StoreManifestSource {
    fn fetch_manifest(&self, base: &str, work_dir: &Path) -> Result<Manifest> {
        info!("Fetching edge manifest of {}", base);
        let snap = self.download(base, work_dir)?;
        let path = self.extract(base, &snap, work_dir)?;
        read_manifest(&path)
    }
}

/// Reads and decodes a `dpkg.yaml` file
pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)?;
    let manifest = Manifest::from_yaml(&content)?;
    debug!("{} lists {} packages", path.display(), manifest.len());
    Ok(manifest)
}

fn run(tool: &str, command: &mut Command) -> Result<()> {
    debug!("Running {:?}", command);
    let output = command.output().map_err(|e| WorkflowError::Tool {
        tool: tool.to_string(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(WorkflowError::Tool {
            tool: tool.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}
