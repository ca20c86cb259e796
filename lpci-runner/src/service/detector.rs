//! Change detector
//!
//! Decides whether a base needs a new build by running rebuild policies in
//! order. The first policy that reports a change wins and the rest are not
//! evaluated.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use lpci_core::Error as CoreError;
use lpci_core::domain::policy::{
    Exclusions, PolicyKind, RebuildDecision, git_tag_indicates_change, should_rebuild,
};
use lpci_core::domain::series::IndexSource;
use tracing::{debug, info};

use crate::error::{Result, WorkflowError};
use crate::repository::{ManifestSource, VcsRepository};
use crate::service::oracle::VersionOracle;

/// A named rebuild condition
#[async_trait]
pub trait RebuildPolicy: Send + Sync {
    fn kind(&self) -> PolicyKind;

    /// Whether this policy asks for a new build
    async fn evaluate(&self) -> Result<bool>;
}

/// Rebuild when HEAD carries no build tag for the branch
pub struct GitTagPolicy {
    vcs: Arc<dyn VcsRepository>,
    branch: String,
}

impl GitTagPolicy {
    pub fn new(vcs: Arc<dyn VcsRepository>, branch: impl Into<String>) -> Self {
        Self {
            vcs,
            branch: branch.into(),
        }
    }
}

#[async_trait]
impl RebuildPolicy for GitTagPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::GitTag
    }

    async fn evaluate(&self) -> Result<bool> {
        let tags = self.vcs.tags_at_head()?;
        for tag in &tags {
            println!("found tag {}", tag);
        }

        let changed = git_tag_indicates_change(&tags, &self.branch);
        if changed {
            println!("no date tag found, triggering build");
        }
        Ok(changed)
    }
}

/// Rebuild when any index offers a newer version of an installed package
pub struct PackageDriftPolicy {
    base: String,
    manifests: Arc<dyn ManifestSource>,
    oracle: VersionOracle,
    sources: Vec<IndexSource>,
    exclusions: Exclusions,
    scratch: PathBuf,
}

impl PackageDriftPolicy {
    pub fn new(
        base: impl Into<String>,
        manifests: Arc<dyn ManifestSource>,
        oracle: VersionOracle,
        sources: Vec<IndexSource>,
        exclusions: Exclusions,
        scratch: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base: base.into(),
            manifests,
            oracle,
            sources,
            exclusions,
            scratch: scratch.into(),
        }
    }
}

#[async_trait]
impl RebuildPolicy for PackageDriftPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::PackageDrift
    }

    async fn evaluate(&self) -> Result<bool> {
        let manifest = self.manifests.fetch_manifest(&self.base, &self.scratch)?;
        let versions = self
            .oracle
            .compute_latest_versions(&self.sources, &self.scratch)
            .await?;

        let report = match should_rebuild(&manifest, &versions, &self.exclusions) {
            Ok(report) => report,
            Err(CoreError::PackageNotIndexed(package)) => {
                return Err(WorkflowError::Configuration(format!(
                    "package {} from {} not found in the archive",
                    package, self.base
                )));
            }
            Err(e) => return Err(e.into()),
        };

        for change in &report.changes {
            println!("change in {}: {}", self.base, change);
        }
        debug!(
            "{}: {} packages checked, {} excluded",
            self.base, report.checked, report.excluded
        );

        Ok(report.changed())
    }
}

/// Evaluates rebuild policies in order
#[derive(Default)]
pub struct ChangeDetector {
    policies: Vec<Box<dyn RebuildPolicy>>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a policy; policies run in insertion order
    pub fn with_policy(mut self, policy: impl RebuildPolicy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Returns the first policy that asks for a build, if any
    pub async fn decide(&self) -> Result<RebuildDecision> {
        for policy in &self.policies {
            debug!("Evaluating {} policy", policy.kind());
            if policy.evaluate().await? {
                info!("Rebuild triggered by {} policy", policy.kind());
                return Ok(RebuildDecision::rebuild(policy.kind()));
            }
        }
        Ok(RebuildDecision::unchanged())
    }
}
