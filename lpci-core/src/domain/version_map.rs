//! Highest-known version per package

use std::collections::BTreeMap;

use crate::domain::version::DebVersion;
use crate::error::{Error, Result};
use crate::index::PackageRecord;

/// Mapping from package name to the highest version observed
///
/// Built by merging records from several package indexes. A stored version
/// is only replaced by a strictly greater one, so the final content does not
/// depend on the order in which indexes are merged.
#[derive(Debug, Clone, Default)]
pub struct PackageVersionMap {
    versions: BTreeMap<String, DebVersion>,
}

/// What a merge did to the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Upgraded,
    Kept,
}

impl PackageVersionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one package version into the map
    pub fn merge(&mut self, package: &str, version: DebVersion) -> MergeOutcome {
        match self.versions.get_mut(package) {
            Some(current) if version > *current => {
                *current = version;
                MergeOutcome::Upgraded
            }
            Some(_) => MergeOutcome::Kept,
            None => {
                self.versions.insert(package.to_string(), version);
                MergeOutcome::Inserted
            }
        }
    }

    /// Merge a record read from a package index
    ///
    /// Records where both name and version are blank are padding and are
    /// ignored. A record with only one of them blank is rejected.
    pub fn merge_record(&mut self, record: &PackageRecord) -> Result<Option<MergeOutcome>> {
        let package = record.package.trim();
        let version = record.version.trim();

        match (package.is_empty(), version.is_empty()) {
            (true, true) => Ok(None),
            (false, false) => Ok(Some(self.merge(package, DebVersion::parse(version)))),
            _ => Err(Error::BlankField {
                package: record.package.clone(),
                version: record.version.clone(),
            }),
        }
    }

    /// Merge every record from an iterator, stopping at the first error
    pub fn merge_records<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<PackageRecord>>,
    {
        let mut merged = 0;
        for record in records {
            if self.merge_record(&record?)?.is_some() {
                merged += 1;
            }
        }
        Ok(merged)
    }

    pub fn get(&self, package: &str) -> Option<&DebVersion> {
        self.versions.get(package)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.versions.contains_key(package)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DebVersion)> {
        self.versions.iter().map(|(name, version)| (name.as_str(), version))
    }
}

impl<S: Into<String>, V: Into<DebVersion>> FromIterator<(S, V)> for PackageVersionMap {
    fn from_iter<T: IntoIterator<Item = (S, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (name, version) in iter {
            let name = name.into();
            map.merge(&name, version.into());
        }
        map
    }
}
