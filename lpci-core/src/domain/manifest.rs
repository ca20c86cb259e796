//! Installed-package manifest of a base snap
//!
//! Base snaps ship `usr/share/snappy/dpkg.yaml`, a YAML document whose
//! `packages` list holds `name[:arch]=version` strings.

use serde::Deserialize;

use crate::domain::version::DebVersion;
use crate::error::{Error, Result};

/// Path of the manifest inside a base snap
pub const DPKG_MANIFEST_PATH: &str = "usr/share/snappy/dpkg.yaml";

#[derive(Debug, Clone, Deserialize)]
struct DpkgYaml {
    #[serde(default)]
    packages: Vec<String>,
}

/// One installed package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Package name without any `:<arch>` qualifier
    pub name: String,
    pub arch: Option<String>,
    pub version: DebVersion,
}

impl ManifestEntry {
    /// Parse a `name[:arch]=version` entry
    pub fn parse(entry: &str) -> Result<Self> {
        let mut parts = entry.split('=');
        let (Some(qualified), Some(version), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::ManifestEntry(entry.to_string()));
        };

        let (name, arch) = match qualified.split_once(':') {
            Some((name, arch)) => (name, Some(arch.to_string())),
            None => (qualified, None),
        };

        if name.trim().is_empty() || version.trim().is_empty() {
            return Err(Error::ManifestEntry(entry.to_string()));
        }

        Ok(Self {
            name: name.trim().to_string(),
            arch,
            version: DebVersion::parse(version),
        })
    }
}

/// Packages installed in a base snap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Decode a `dpkg.yaml` document
    pub fn from_yaml(input: &str) -> Result<Self> {
        let doc: DpkgYaml = serde_yaml::from_str(input)?;
        let entries = doc
            .packages
            .iter()
            .map(|entry| ManifestEntry::parse(entry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<DebVersion>> FromIterator<(N, V)> for Manifest {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, version)| ManifestEntry {
                    name: name.into(),
                    arch: None,
                    version: version.into(),
                })
                .collect(),
        }
    }
}
