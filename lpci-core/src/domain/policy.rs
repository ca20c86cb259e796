//! Rebuild policies
//!
//! Each policy answers "does this base need a new build?" from explicit
//! inputs. The workflow evaluates them in order and stops at the first one
//! that says yes.

use std::collections::HashSet;
use std::fmt;

use crate::domain::manifest::Manifest;
use crate::domain::series::{BUILT_BY_SNAP, CoreSeries};
use crate::domain::tag::is_build_tag;
use crate::domain::version::DebVersion;
use crate::domain::version_map::PackageVersionMap;
use crate::error::{Error, Result};

/// Identifies a rebuild policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// HEAD carries no build tag for the branch
    GitTag,
    /// An index carries a newer version of an installed package
    PackageDrift,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::GitTag => write!(f, "git-tag"),
            PolicyKind::PackageDrift => write!(f, "package-drift"),
        }
    }
}

/// Outcome of evaluating the policy chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RebuildDecision {
    /// The first policy that demanded a build, if any
    pub triggered_by: Option<PolicyKind>,
}

impl RebuildDecision {
    pub fn rebuild(kind: PolicyKind) -> Self {
        Self {
            triggered_by: Some(kind),
        }
    }

    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn should_build(&self) -> bool {
        self.triggered_by.is_some()
    }
}

/// Packages exempt from the drift check, active only under a condition
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    packages: HashSet<String>,
    active: bool,
}

impl Exclusions {
    pub fn new<I, S>(packages: I, active: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
            active,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Packages a base builds itself, exempt only where that applies
    pub fn for_series(series: CoreSeries) -> Self {
        Self::new(
            BUILT_BY_SNAP.iter().copied(),
            series.excludes_snap_built_packages(),
        )
    }

    pub fn excludes(&self, package: &str) -> bool {
        self.active && self.packages.contains(package)
    }
}

/// A package whose indexed version is newer than the installed one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageChange {
    pub package: String,
    pub installed: DebVersion,
    pub available: DebVersion,
}

impl fmt::Display for PackageChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} package version updated ({} -> {})",
            self.package, self.installed, self.available
        )
    }
}

/// Result of the package drift check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    /// Every detected change, in manifest order
    pub changes: Vec<PackageChange>,
    pub checked: usize,
    pub excluded: usize,
}

impl DriftReport {
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Compare a manifest against the highest indexed versions
///
/// All packages are checked even after the first change so the report is
/// complete. A manifest package absent from every index means the index set
/// is incomplete and is an error, not "no change".
pub fn should_rebuild(
    manifest: &Manifest,
    versions: &PackageVersionMap,
    exclusions: &Exclusions,
) -> Result<DriftReport> {
    let mut report = DriftReport::default();

    for entry in &manifest.entries {
        if exclusions.excludes(&entry.name) {
            report.excluded += 1;
            continue;
        }

        let available = versions
            .get(&entry.name)
            .ok_or_else(|| Error::PackageNotIndexed(entry.name.clone()))?;

        report.checked += 1;
        if entry.version < *available {
            report.changes.push(PackageChange {
                package: entry.name.clone(),
                installed: entry.version.clone(),
                available: available.clone(),
            });
        }
    }

    Ok(report)
}

/// Whether HEAD still needs a build, judged by its tags
///
/// A `<date>[-<seq>]_<branch>` tag on HEAD means the current state was
/// already built.
pub fn git_tag_indicates_change(tags_at_head: &[String], branch: &str) -> bool {
    !tags_at_head.iter().any(|tag| is_build_tag(tag, branch))
}
