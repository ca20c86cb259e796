//! Build trigger
//!
//! Turns a decision to build into remote builds:
//! - Base images: one `requestBuilds` call using the recipe defaults,
//!   bracketed by a build tag pushed to the git remote
//! - Snaps: one `requestBuild` call per architecture, against a static
//!   team recipe or an ephemeral recipe created for the run

use std::sync::Arc;

use chrono::NaiveDate;
use lpci_core::domain::build::{BuildJob, RequestStatus};
use lpci_core::domain::tag::BuildTag;
use lpci_core::dto::build::SnapBuild;
use lpci_core::dto::snap::{BuildParams, BuildsParams, NewSnap, Snap};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, WorkflowError};
use crate::repository::{BuildRepository, RecipeRepository, VcsRepository};
use crate::scheduler::BuildPoller;

/// Team owning static recipes and ephemeral recipes
pub const RECIPE_OWNER: &str = "snappy-hwe-team";

/// Architectures Launchpad can build snaps for
pub const VALID_ARCHES: &[&str] = &[
    "armhf", "i386", "amd64", "arm64", "s390x", "powerpc", "ppc64el", "riscv64",
];

/// Architecture built when none was requested for an ephemeral recipe
pub const FALLBACK_ARCH: &str = "amd64";

/// Result of a trigger attempt
#[derive(Debug)]
pub enum TriggerOutcome {
    /// A build was already pending or running; nothing was done
    Skipped,
    /// Dry run: the tag that would have been used
    DryRun { tag: BuildTag },
    /// Builds were accepted by the service
    Requested {
        jobs: Vec<BuildJob>,
        tag: Option<BuildTag>,
    },
}

/// Where the recipe of a snap build comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeSource {
    /// Existing team recipe, re-pointed at the branch
    Static { name: String, branch: String },
    /// Throwaway recipe created for this run and deleted afterwards
    Ephemeral {
        name: String,
        repo: String,
        branch: String,
    },
}

impl RecipeSource {
    /// Picks the recipe for `snap` from the git parameters
    ///
    /// Branches named `snap-*` or `latest*` have a static recipe
    /// `<snap>-<branch up to the first '_'>`; anything else needs both a
    /// repository and a branch for an ephemeral recipe.
    pub fn resolve(snap: &str, git_repo: Option<&str>, branch: Option<&str>) -> Result<Self> {
        if let Some(branch) = branch
            && (branch.starts_with("snap-") || branch.starts_with("latest"))
        {
            let suffix = branch.split('_').next().unwrap_or(branch);
            return Ok(Self::Static {
                name: format!("{snap}-{suffix}"),
                branch: branch.to_string(),
            });
        }

        match (git_repo, branch) {
            (Some(repo), Some(branch)) => Ok(Self::Ephemeral {
                name: ephemeral_recipe_name(snap),
                repo: repo.to_string(),
                branch: branch.to_string(),
            }),
            _ => Err(WorkflowError::configuration(
                "No git repository or a branch supplied",
            )),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Static { name, .. } | Self::Ephemeral { name, .. } => name,
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral { .. })
    }
}

/// `ci-<snap>-<16 random lowercase alphanumerics>`
pub fn ephemeral_recipe_name(snap: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(16).collect();
    format!("ci-{snap}-{suffix}")
}

/// A recipe ready to build, with the architectures to request
#[derive(Debug, Clone)]
pub struct PreparedRecipe {
    pub snap: Snap,
    pub ephemeral: bool,
    pub arches: Vec<String>,
}

/// Build settings of a snap build
#[derive(Debug, Clone)]
pub struct SnapTarget {
    /// Base snap, e.g. `core22`
    pub base: String,
    /// Ubuntu codename the base builds on
    pub series: String,
    pub snapcraft_channel: String,
}

/// Issues build requests
pub struct BuildTrigger {
    recipes: Arc<dyn RecipeRepository>,
    builds: Arc<dyn BuildRepository>,
    poller: Arc<BuildPoller>,
}

impl BuildTrigger {
    pub fn new(
        recipes: Arc<dyn RecipeRepository>,
        builds: Arc<dyn BuildRepository>,
        poller: Arc<BuildPoller>,
    ) -> Self {
        Self {
            recipes,
            builds,
            poller,
        }
    }

    /// Whether the recipe has a pending request or a queued or running build
    pub async fn is_build_running(&self, snap: &Snap) -> Result<bool> {
        if !self.recipes.pending_build_requests(snap).await?.is_empty() {
            println!("A {} snap build request is pending, skipping.", snap.name);
            return Ok(true);
        }

        let builds = self.recipes.pending_builds(snap).await?;
        if builds.iter().any(|b| b.state().blocks_new_builds()) {
            println!("A {} snap build is in progress.", snap.name);
            return Ok(true);
        }

        println!("No {} snap build pending or currently running.", snap.name);
        Ok(false)
    }

    /// Tags HEAD and requests builds of a base image
    ///
    /// The tag is pushed before the request so that a concurrent run sees the
    /// commit as built. It is removed again if the request fails.
    pub async fn trigger_base(
        &self,
        snap: &Snap,
        vcs: &dyn VcsRepository,
        branch: &str,
        today: NaiveDate,
        dry_run: bool,
    ) -> Result<TriggerOutcome> {
        let existing = vcs.tags_matching(&BuildTag::list_pattern(today, branch))?;
        let tag = BuildTag::next(today, branch, &existing);

        if dry_run {
            println!(
                "Would trigger new snap builds for {}, with tag {}.",
                snap.name, tag
            );
            return Ok(TriggerOutcome::DryRun { tag });
        }

        println!(
            "Triggering new snap build of {}, with tag {}.",
            snap.name, tag
        );
        let tag_name = tag.to_string();
        vcs.create_tag(&tag_name)?;
        vcs.push_tag(&tag_name)?;

        let request = match self
            .recipes
            .request_builds(snap, &BuildsParams::from(snap))
            .await
        {
            Ok(request) => request,
            Err(e) => {
                abandon_tag(vcs, &tag_name);
                return Err(e.into());
            }
        };
        println!(
            "builds requested: {}",
            request
                .builds_collection_link
                .as_deref()
                .unwrap_or(&request.self_link)
        );

        let request = self.poller.await_request(request).await;
        if request.status() == RequestStatus::Failed {
            println!("Cannot start builds, request failed");
            abandon_tag(vcs, &tag_name);
            return Err(WorkflowError::RequestFailed {
                snap: snap.name.clone(),
                message: request
                    .error_message
                    .unwrap_or_else(|| "no reason given".to_string()),
            });
        }
        println!("Request builds sucessful");

        let builds = match self.builds.builds_of(&request).await {
            Ok(builds) => builds,
            Err(e) => {
                abandon_tag(vcs, &tag_name);
                return Err(e.into());
            }
        };
        let jobs: Vec<BuildJob> = builds.iter().map(SnapBuild::to_job).collect();
        info!("{} build(s) of {} started", jobs.len(), snap.name);

        Ok(TriggerOutcome::Requested {
            jobs,
            tag: Some(tag),
        })
    }

    /// Looks up or creates the recipe and settles the architectures to build
    pub async fn prepare_recipe(
        &self,
        snap_name: &str,
        source: &RecipeSource,
        series: &str,
        requested: &[String],
    ) -> Result<PreparedRecipe> {
        let owner_link = self.recipes.person_link(RECIPE_OWNER);

        match source {
            RecipeSource::Static { name, branch } => {
                println!("Getting snap recipe {} from {} team", name, RECIPE_OWNER);
                let snap = self
                    .recipes
                    .find_snap(name, &owner_link)
                    .await?
                    .ok_or_else(|| {
                        WorkflowError::configuration(format!(
                            "snap recipe {} not found in {} team",
                            name, RECIPE_OWNER
                        ))
                    })?;

                // The repository URL of a recipe is read-only; only the ref moves
                let git_path = format!("refs/heads/{branch}");
                self.recipes.set_git_path(&snap, &git_path).await?;

                let enabled: Vec<String> = self
                    .recipes
                    .processors(&snap)
                    .await?
                    .into_iter()
                    .map(|p| p.name)
                    .collect();
                let arches = if requested.is_empty() {
                    enabled
                } else {
                    requested
                        .iter()
                        .filter(|arch| {
                            let ok = enabled.contains(arch);
                            if !ok {
                                println!(
                                    "WARNING: Can't build {} snap for architecture {} as it is not enabled in the build job",
                                    snap_name, arch
                                );
                            }
                            ok
                        })
                        .cloned()
                        .collect()
                };

                let arches = allowed_arches(snap_name, arches)?;
                Ok(PreparedRecipe {
                    snap,
                    ephemeral: false,
                    arches,
                })
            }
            RecipeSource::Ephemeral { name, repo, branch } => {
                let requested = if requested.is_empty() {
                    println!(
                        "WARNING: No architectures to build specified. Will only build for {}.",
                        FALLBACK_ARCH
                    );
                    vec![FALLBACK_ARCH.to_string()]
                } else {
                    requested.to_vec()
                };
                let arches = allowed_arches(snap_name, requested)?;

                let mut processor_links = Vec::with_capacity(arches.len());
                for arch in &arches {
                    let processor = self.recipes.processor_by_name(arch).await.map_err(|e| {
                        WorkflowError::configuration(format!(
                            "Failed to find processor for '{}' architecture: {}",
                            arch, e
                        ))
                    })?;
                    processor_links.push(processor.self_link);
                }

                let distro_series = self.recipes.distro_series(series).await?;
                println!("Creating ephemeral snap recipe for \"{}\" series", series);
                let snap = self
                    .recipes
                    .create_snap(&NewSnap {
                        name: name.clone(),
                        owner_link,
                        distro_series_link: distro_series.self_link,
                        git_repository_url: repo.clone(),
                        git_path: branch.clone(),
                        processor_links,
                        auto_build: false,
                    })
                    .await?;
                debug!("Created recipe {}", snap.self_link);

                Ok(PreparedRecipe {
                    snap,
                    ephemeral: true,
                    arches,
                })
            }
        }
    }

    /// Requests one build per architecture of the recipe
    pub async fn trigger_snap(
        &self,
        recipe: &PreparedRecipe,
        target: &SnapTarget,
    ) -> Result<Vec<BuildJob>> {
        let archive_link = self.recipes.primary_archive_link();
        let mut jobs = Vec::with_capacity(recipe.arches.len());

        for arch in &recipe.arches {
            let params = BuildParams {
                archive_link: archive_link.clone(),
                distro_arch_series_link: self
                    .recipes
                    .distro_arch_series_link(&target.series, arch),
                pocket: "Updates".to_string(),
                channels: serde_json::json!({ "snapcraft": target.snapcraft_channel }),
                snap_base: Some(format!("/+snap-bases/{}", target.base)),
            };

            let job = self.recipes.request_build(&recipe.snap, &params, arch).await?;
            println!("Arch: {} is building under: {}", arch, job.self_link);
            jobs.push(job);
        }

        Ok(jobs)
    }
}

/// Removes a build tag from the remote, then locally
pub fn remove_build_tag(vcs: &dyn VcsRepository, tag: &str) -> Result<()> {
    debug!("Removing tag {}", tag);
    vcs.delete_remote_tag(tag)?;
    vcs.delete_tag(tag)
}

/// Removes the tag of a build that never started, keeping the caller's error
fn abandon_tag(vcs: &dyn VcsRepository, tag: &str) {
    if let Err(e) = remove_build_tag(vcs, tag) {
        warn!("Could not remove tag {}: {}", tag, e);
    }
}

/// Drops architectures Launchpad cannot build for
fn allowed_arches(snap_name: &str, arches: Vec<String>) -> Result<Vec<String>> {
    let allowed: Vec<String> = arches
        .into_iter()
        .filter(|arch| {
            let ok = VALID_ARCHES.contains(&arch.as_str());
            if !ok {
                println!(
                    "WARNING: Can't build {} snap for architecture {} as it is not a valid build architecture",
                    snap_name, arch
                );
            }
            ok
        })
        .collect();

    if allowed.is_empty() {
        return Err(WorkflowError::NoArchitectures(snap_name.to_string()));
    }
    Ok(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLaunchpad, FakeVcs, fast_config, recipe};

    fn trigger(lp: &FakeLaunchpad) -> BuildTrigger {
        let lp = Arc::new(lp.clone());
        let poller = Arc::new(BuildPoller::new(&fast_config(), lp.clone()));
        BuildTrigger::new(lp.clone(), lp, poller)
    }

    fn may_10() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 10).unwrap()
    }

    fn arches(names: &[&str]) -> Vec<String> {
        names.iter().map(|a| a.to_string()).collect()
    }

    #[tokio::test]
    async fn test_pending_request_means_running() {
        let lp = FakeLaunchpad::new();
        lp.add_pending_request();
        let snap = recipe("ubuntu-core-service", "core22");
        assert!(trigger(&lp).is_build_running(&snap).await.unwrap());
    }

    #[tokio::test]
    async fn test_only_queued_or_building_builds_block() {
        let snap = recipe("ubuntu-core-service", "core22");

        let lp = FakeLaunchpad::new();
        lp.add_pending_build("Dependency wait");
        assert!(!trigger(&lp).is_build_running(&snap).await.unwrap());

        let lp = FakeLaunchpad::new();
        lp.add_pending_build("Currently building");
        assert!(trigger(&lp).is_build_running(&snap).await.unwrap());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_tag() {
        let lp = FakeLaunchpad::new();
        let vcs = FakeVcs::new("main");
        vcs.add_head_tag("20250510_main");
        let snap = recipe("ubuntu-core-service", "core22");

        let outcome = trigger(&lp)
            .trigger_base(&snap, &vcs, "main", may_10(), true)
            .await
            .unwrap();

        match outcome {
            TriggerOutcome::DryRun { tag } => assert_eq!(tag.to_string(), "20250510-1_main"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(vcs.events().is_empty());
        assert_eq!(lp.builds_requested(), 0);
    }

    #[tokio::test]
    async fn test_trigger_base_tags_then_requests() {
        let lp = FakeLaunchpad::new();
        lp.script_arch("amd64", &["FULLYBUILT"]);
        lp.script_arch("arm64", &["FULLYBUILT"]);
        lp.script_request(&["Pending", "Completed"]);
        let vcs = FakeVcs::new("main");
        let snap = recipe("ubuntu-core-service", "core22");

        let outcome = trigger(&lp)
            .trigger_base(&snap, &vcs, "main", may_10(), false)
            .await
            .unwrap();

        let TriggerOutcome::Requested { jobs, tag } = outcome else {
            panic!("builds were not requested");
        };
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].arch, "amd64");
        assert_eq!(tag.unwrap().to_string(), "20250510_main");
        assert_eq!(vcs.events(), vec!["tag 20250510_main", "push 20250510_main"]);
        assert_eq!(lp.builds_requested(), 1);
    }

    #[tokio::test]
    async fn test_failed_request_removes_tag() {
        let lp = FakeLaunchpad::new();
        lp.fail_request_builds();
        let vcs = FakeVcs::new("main");
        let snap = recipe("ubuntu-core-service", "core22");

        let err = trigger(&lp)
            .trigger_base(&snap, &vcs, "main", may_10(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::RequestFailed { .. }));
        assert_eq!(
            vcs.events(),
            vec![
                "tag 20250510_main",
                "push 20250510_main",
                "push :20250510_main",
                "tag --delete 20250510_main",
            ]
        );
        assert!(vcs.remote_tags().is_empty());
        assert!(vcs.head_tags().is_empty());
    }

    #[tokio::test]
    async fn test_tag_on_older_commit_is_not_reused() {
        let lp = FakeLaunchpad::new();
        lp.script_arch("amd64", &["FULLYBUILT"]);
        let vcs = FakeVcs::new("main");
        vcs.add_older_tag("20250510_main");
        vcs.add_older_tag("20250510-1_main");
        vcs.add_older_tag("20250509-5_main");
        let snap = recipe("ubuntu-core-service", "core22");

        let outcome = trigger(&lp)
            .trigger_base(&snap, &vcs, "main", may_10(), false)
            .await
            .unwrap();

        let TriggerOutcome::Requested { tag, .. } = outcome else {
            panic!("builds were not requested");
        };
        assert_eq!(tag.unwrap().to_string(), "20250510-2_main");
        assert_eq!(vcs.events()[0], "tag 20250510-2_main");
    }

    #[tokio::test]
    async fn test_cleanup_failure_keeps_request_error() {
        let lp = FakeLaunchpad::new();
        lp.fail_request_builds();
        let vcs = FakeVcs::new("main");
        vcs.fail_delete();
        let snap = recipe("ubuntu-core-service", "core22");

        let err = trigger(&lp)
            .trigger_base(&snap, &vcs, "main", may_10(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::RequestFailed { .. }));
        assert_eq!(vcs.remote_tags(), vec!["20250510_main"]);
    }

    #[tokio::test]
    async fn test_listing_builds_failure_removes_tag() {
        let lp = FakeLaunchpad::new();
        lp.script_arch("amd64", &["FULLYBUILT"]);
        lp.fail_builds_of();
        let vcs = FakeVcs::new("main");
        let snap = recipe("ubuntu-core-service", "core22");

        let err = trigger(&lp)
            .trigger_base(&snap, &vcs, "main", may_10(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Client(_)));
        assert!(vcs.remote_tags().is_empty());
        assert!(vcs.head_tags().is_empty());
    }

    #[tokio::test]
    async fn test_push_failure_stops_before_request() {
        let lp = FakeLaunchpad::new();
        let vcs = FakeVcs::new("main");
        vcs.fail_push();
        let snap = recipe("ubuntu-core-service", "core22");

        let err = trigger(&lp)
            .trigger_base(&snap, &vcs, "main", may_10(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Vcs { .. }));
        assert_eq!(lp.builds_requested(), 0);
    }

    #[test]
    fn test_recipe_source() {
        let source = RecipeSource::resolve("pc-kernel", None, Some("snap-22_1699")).unwrap();
        assert_eq!(
            source,
            RecipeSource::Static {
                name: "pc-kernel-snap-22".to_string(),
                branch: "snap-22_1699".to_string(),
            }
        );

        let source = RecipeSource::resolve("pc-kernel", None, Some("latest")).unwrap();
        assert_eq!(source.name(), "pc-kernel-latest");

        let source =
            RecipeSource::resolve("pc-kernel", Some("https://git.test/pc"), Some("main")).unwrap();
        assert!(source.is_ephemeral());
        assert!(source.name().starts_with("ci-pc-kernel-"));
        assert_eq!(source.name().len(), "ci-pc-kernel-".len() + 16);

        let err = RecipeSource::resolve("pc-kernel", None, Some("main")).unwrap_err();
        assert_eq!(err.to_string(), "No git repository or a branch supplied");
    }

    #[tokio::test]
    async fn test_static_recipe_intersects_enabled_processors() {
        let lp = FakeLaunchpad::new();
        lp.add_snap(recipe(RECIPE_OWNER, "pc-kernel-snap-22"));
        lp.enable_processors(&["amd64", "arm64", "riscv64"]);
        let source = RecipeSource::resolve("pc-kernel", None, Some("snap-22_foo")).unwrap();

        let prepared = trigger(&lp)
            .prepare_recipe("pc-kernel", &source, "jammy", &arches(&["amd64", "s390x"]))
            .await
            .unwrap();

        assert!(!prepared.ephemeral);
        assert_eq!(prepared.arches, vec!["amd64"]);
        assert_eq!(lp.git_paths(), vec!["refs/heads/snap-22_foo"]);
    }

    #[tokio::test]
    async fn test_static_recipe_defaults_to_enabled_processors() {
        let lp = FakeLaunchpad::new();
        lp.add_snap(recipe(RECIPE_OWNER, "pc-kernel-latest"));
        lp.enable_processors(&["amd64", "lpia", "arm64"]);
        let source = RecipeSource::resolve("pc-kernel", None, Some("latest")).unwrap();

        let prepared = trigger(&lp)
            .prepare_recipe("pc-kernel", &source, "jammy", &[])
            .await
            .unwrap();

        assert_eq!(prepared.arches, vec!["amd64", "arm64"]);
    }

    #[tokio::test]
    async fn test_ephemeral_recipe_creation() {
        let lp = FakeLaunchpad::new();
        let source =
            RecipeSource::resolve("pc-kernel", Some("https://git.test/pc"), Some("main")).unwrap();

        let prepared = trigger(&lp)
            .prepare_recipe("pc-kernel", &source, "jammy", &[])
            .await
            .unwrap();

        assert!(prepared.ephemeral);
        assert_eq!(prepared.arches, vec![FALLBACK_ARCH]);

        let created = lp.created();
        assert_eq!(created.len(), 1);
        assert!(!created[0].auto_build);
        assert_eq!(created[0].git_path, "main");
        assert_eq!(created[0].processor_links.len(), 1);
        assert!(created[0].distro_series_link.ends_with("/ubuntu/jammy"));
    }

    #[tokio::test]
    async fn test_unknown_processor_is_fatal() {
        let lp = FakeLaunchpad::new();
        lp.forget_processor("arm64");
        let source =
            RecipeSource::resolve("pc-kernel", Some("https://git.test/pc"), Some("main")).unwrap();

        let err = trigger(&lp)
            .prepare_recipe("pc-kernel", &source, "jammy", &arches(&["amd64", "arm64"]))
            .await
            .unwrap_err();

        assert!(
            err.to_string()
                .starts_with("Failed to find processor for 'arm64' architecture")
        );
        assert!(lp.created().is_empty());
    }

    #[tokio::test]
    async fn test_no_valid_architecture_creates_nothing() {
        let lp = FakeLaunchpad::new();
        let source =
            RecipeSource::resolve("pc-kernel", Some("https://git.test/pc"), Some("main")).unwrap();

        let err = trigger(&lp)
            .prepare_recipe("pc-kernel", &source, "jammy", &arches(&["lpia"]))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::NoArchitectures(_)));
        assert!(lp.created().is_empty());
    }

    #[tokio::test]
    async fn test_trigger_snap_requests_each_arch() {
        let lp = FakeLaunchpad::new();
        let prepared = PreparedRecipe {
            snap: recipe(RECIPE_OWNER, "pc-kernel-snap-22"),
            ephemeral: false,
            arches: arches(&["amd64", "arm64"]),
        };
        let target = SnapTarget {
            base: "core22".to_string(),
            series: "jammy".to_string(),
            snapcraft_channel: "latest/stable".to_string(),
        };

        let jobs = trigger(&lp).trigger_snap(&prepared, &target).await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].arch, "arm64");
        assert_eq!(jobs[0].id, "1000");

        let requested = lp.requested();
        assert_eq!(requested[0].pocket, "Updates");
        assert_eq!(requested[0].snap_base.as_deref(), Some("/+snap-bases/core22"));
        assert_eq!(requested[0].channels["snapcraft"], "latest/stable");
        assert!(requested[1].distro_arch_series_link.ends_with("/jammy/arm64"));
        assert!(requested[0].archive_link.ends_with("/+archive/primary"));
    }
}
