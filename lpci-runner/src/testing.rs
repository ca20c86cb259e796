//! In-memory fakes of the repositories for service and workflow tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use lpci_client::{ClientError, Result as ClientResult};
use lpci_core::domain::build::{BuildJob, build_id_from_link};
use lpci_core::domain::manifest::Manifest;
use lpci_core::dto::build::{BuildRequest, BuildSummaries, BuildSummary, SnapBuild};
use lpci_core::dto::snap::{BuildParams, BuildsParams, DistroSeries, NewSnap, Processor, Snap};

use crate::config::Config;
use crate::error::{Result, WorkflowError};
use crate::repository::{
    BuildRepository, FileRepository, ManifestSource, RecipeRepository, VcsRepository,
};

pub const API: &str = "https://api.launchpad.test/devel";
pub const LIBRARIAN: &str = "https://librarian.test";

/// Gzip compress a text document
pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Configuration with millisecond poll intervals
pub fn fast_config() -> Config {
    Config {
        api_root: API.to_string(),
        request_poll_interval: Duration::from_millis(1),
        build_poll_interval: Duration::from_millis(1),
        download_attempts: 3,
        http_timeout: Duration::from_secs(5),
    }
}

/// A recipe as the service would return it
pub fn recipe(owner: &str, name: &str) -> Snap {
    let self_link = format!("{API}/~{owner}/+snap/{name}");
    Snap {
        web_link: Some(self_link.replace("api.launchpad.test/devel", "launchpad.test")),
        name: name.to_string(),
        auto_build_archive_link: Some(format!("{API}/ubuntu/+archive/primary")),
        auto_build_pocket: Some("Updates".to_string()),
        auto_build_channels: Some(serde_json::json!({"snapcraft": "7.x/stable"})),
        pending_build_requests_collection_link: Some(format!("{self_link}/pending_build_requests")),
        pending_builds_collection_link: Some(format!("{self_link}/pending_builds")),
        processors_collection_link: Some(format!("{self_link}/processors")),
        git_path: Some("refs/heads/main".to_string()),
        git_repository_url: Some("https://git.launchpad.test/snap".to_string()),
        self_link,
    }
}

struct BuildInfo {
    arch: String,
    snap: String,
    link: String,
}

#[derive(Default)]
struct LaunchpadState {
    snaps: Vec<Snap>,
    pending_requests: Vec<BuildRequest>,
    pending_builds: Vec<SnapBuild>,
    enabled_processors: Vec<String>,
    unknown_processors: HashSet<String>,
    /// Architectures builds are scripted for, in request order
    arch_scripts: Vec<(String, VecDeque<String>)>,
    builds: HashMap<String, BuildInfo>,
    states: HashMap<String, VecDeque<String>>,
    /// Pending summary timeouts per architecture
    summary_failures: HashMap<String, u32>,
    arch_file_urls: HashMap<String, Vec<String>>,
    request_statuses: VecDeque<String>,
    request_builds: Vec<SnapBuild>,
    request_builds_fail: bool,
    builds_of_fail: bool,
    files: HashMap<String, Vec<u8>>,
    file_urls: HashMap<String, Vec<String>>,
    download_failures: HashMap<String, u32>,
    download_attempts: HashMap<String, u32>,
    next_build_id: u64,
    created: Vec<NewSnap>,
    deleted: Vec<String>,
    git_paths: Vec<String>,
    requested: Vec<BuildParams>,
    builds_requested: u32,
}

/// Scriptable in-memory Launchpad
#[derive(Clone, Default)]
pub struct FakeLaunchpad {
    state: Arc<Mutex<LaunchpadState>>,
}

impl FakeLaunchpad {
    pub fn new() -> Self {
        let lp = Self::default();
        lp.state().next_build_id = 1000;
        lp
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LaunchpadState> {
        self.state.lock().unwrap()
    }

    pub fn add_snap(&self, snap: Snap) {
        self.state().snaps.push(snap);
    }

    pub fn enable_processors(&self, arches: &[&str]) {
        self.state().enabled_processors = arches.iter().map(|a| a.to_string()).collect();
    }

    pub fn forget_processor(&self, arch: &str) {
        self.state().unknown_processors.insert(arch.to_string());
    }

    pub fn add_pending_request(&self) {
        self.state().pending_requests.push(BuildRequest {
            self_link: format!("{API}/~x/+snap/y/+build-request/1"),
            web_link: None,
            status: "Pending".to_string(),
            error_message: None,
            builds_collection_link: None,
        });
    }

    pub fn add_pending_build(&self, buildstate: &str) {
        self.state().pending_builds.push(SnapBuild {
            self_link: format!("{API}/~x/+snap/y/+build/1"),
            web_link: None,
            title: None,
            buildstate: Some(buildstate.to_string()),
            arch_tag: Some("amd64".to_string()),
            build_log_url: None,
        });
    }

    /// Statuses successive polls of the build for `arch` report
    pub fn script_arch(&self, arch: &str, statuses: &[&str]) {
        self.state().arch_scripts.push((
            arch.to_string(),
            statuses.iter().map(|s| s.to_string()).collect(),
        ));
    }

    /// Statuses successive reads of a build request report
    pub fn script_request(&self, statuses: &[&str]) {
        self.state().request_statuses = statuses.iter().map(|s| s.to_string()).collect();
    }

    pub fn fail_request_builds(&self) {
        self.state().request_builds_fail = true;
    }

    /// Listing the builds of a completed request times out
    pub fn fail_builds_of(&self) {
        self.state().builds_of_fail = true;
    }

    /// The next `times` summary queries for the build of `arch` time out
    pub fn fail_summaries(&self, arch: &str, times: u32) {
        self.state().summary_failures.insert(arch.to_string(), times);
    }

    pub fn serve(&self, url: &str, content: Vec<u8>) {
        self.state().files.insert(url.to_string(), content);
    }

    pub fn fail_downloads(&self, url: &str, times: u32) {
        self.state().download_failures.insert(url.to_string(), times);
    }

    /// Files a build lists, replacing the default artifacts
    pub fn set_file_urls(&self, arch: &str, urls: &[&str]) {
        let mut state = self.state();
        state
            .arch_file_urls
            .insert(arch.to_string(), urls.iter().map(|u| u.to_string()).collect());
        for id in ids_for_arch(&state, arch) {
            let link = state.builds[&id].link.clone();
            state
                .file_urls
                .insert(link, urls.iter().map(|u| u.to_string()).collect());
        }
    }

    pub fn download_attempts(&self, url: &str) -> u32 {
        self.state().download_attempts.get(url).copied().unwrap_or(0)
    }

    pub fn created(&self) -> Vec<NewSnap> {
        self.state().created.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    pub fn git_paths(&self) -> Vec<String> {
        self.state().git_paths.clone()
    }

    pub fn requested(&self) -> Vec<BuildParams> {
        self.state().requested.clone()
    }

    pub fn builds_requested(&self) -> u32 {
        self.state().builds_requested
    }

    pub fn build_ids(&self) -> Vec<String> {
        let state = self.state();
        let mut ids: Vec<String> = state.builds.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Register a new build of `snap` for `arch`, with default artifacts
    fn spawn_build(state: &mut LaunchpadState, snap: &Snap, arch: &str) -> String {
        let id = state.next_build_id.to_string();
        state.next_build_id += 1;

        let script = state
            .arch_scripts
            .iter()
            .find(|(a, _)| a == arch)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| VecDeque::from(vec!["FULLYBUILT".to_string()]));
        let link = format!("{}/+build/{}", snap.self_link, id);
        state.states.insert(id.clone(), script);
        state.builds.insert(
            id.clone(),
            BuildInfo {
                arch: arch.to_string(),
                snap: snap.name.clone(),
                link: link.clone(),
            },
        );

        let log = log_url(&snap.name, arch, &id);
        state
            .files
            .insert(log, gzip(&format!("build log of {arch}\n")));

        let artifact = format!("{LIBRARIAN}/{id}/{}_{arch}.snap", snap.name);
        let manifest = format!("{LIBRARIAN}/{id}/{}_{arch}.manifest", snap.name);
        state
            .files
            .insert(artifact.clone(), format!("snap for {arch}").into_bytes());
        state
            .files
            .insert(manifest.clone(), b"manifest".to_vec());
        let urls = state
            .arch_file_urls
            .get(arch)
            .cloned()
            .unwrap_or_else(|| vec![artifact, manifest]);
        state.file_urls.insert(link.clone(), urls);

        link
    }

    fn next_status(state: &mut LaunchpadState, id: &str) -> String {
        match state.states.get_mut(id) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => "FULLYBUILT".to_string(),
        }
    }

    fn fetch(&self, url: &str) -> ClientResult<Vec<u8>> {
        let mut state = self.state();
        *state.download_attempts.entry(url.to_string()).or_default() += 1;

        if let Some(remaining) = state.download_failures.get_mut(url)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(ClientError::api_error(503, "Service Unavailable"));
        }

        state
            .files
            .get(url)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(url.to_string()))
    }
}

pub fn log_url(snap: &str, arch: &str, id: &str) -> String {
    format!("{LIBRARIAN}/{id}/buildlog_snap_ubuntu_jammy_{arch}_{snap}_BUILDING.txt.gz")
}

fn ids_for_arch(state: &LaunchpadState, arch: &str) -> Vec<String> {
    state
        .builds
        .iter()
        .filter(|(_, info)| info.arch == arch)
        .map(|(id, _)| id.clone())
        .collect()
}

#[async_trait]
impl RecipeRepository for FakeLaunchpad {
    async fn get_snap(&self, link: &str) -> ClientResult<Snap> {
        self.state()
            .snaps
            .iter()
            .find(|s| s.self_link == link || s.self_link.ends_with(link))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(link.to_string()))
    }

    async fn find_snap(&self, name: &str, _owner_link: &str) -> ClientResult<Option<Snap>> {
        Ok(self.state().snaps.iter().find(|s| s.name == name).cloned())
    }

    async fn create_snap(&self, new: &NewSnap) -> ClientResult<Snap> {
        let mut snap = recipe("snappy-hwe-team", &new.name);
        snap.git_path = Some(new.git_path.clone());
        snap.git_repository_url = Some(new.git_repository_url.clone());

        let mut state = self.state();
        state.created.push(new.clone());
        state.snaps.push(snap.clone());
        Ok(snap)
    }

    async fn set_git_path(&self, snap: &Snap, git_path: &str) -> ClientResult<()> {
        let mut state = self.state();
        state.git_paths.push(git_path.to_string());
        if let Some(stored) = state.snaps.iter_mut().find(|s| s.self_link == snap.self_link) {
            stored.git_path = Some(git_path.to_string());
        }
        Ok(())
    }

    async fn delete_snap(&self, snap: &Snap) -> ClientResult<()> {
        let mut state = self.state();
        state.deleted.push(snap.name.clone());
        state.snaps.retain(|s| s.self_link != snap.self_link);
        Ok(())
    }

    async fn pending_build_requests(&self, _snap: &Snap) -> ClientResult<Vec<BuildRequest>> {
        Ok(self.state().pending_requests.clone())
    }

    async fn pending_builds(&self, _snap: &Snap) -> ClientResult<Vec<SnapBuild>> {
        Ok(self.state().pending_builds.clone())
    }

    async fn processors(&self, _snap: &Snap) -> ClientResult<Vec<Processor>> {
        Ok(self
            .state()
            .enabled_processors
            .iter()
            .map(|name| Processor {
                name: name.clone(),
                self_link: format!("{API}/+processors/{name}"),
            })
            .collect())
    }

    async fn processor_by_name(&self, name: &str) -> ClientResult<Processor> {
        if self.state().unknown_processors.contains(name) {
            return Err(ClientError::NotFound(format!("{API}/+processors/{name}")));
        }
        Ok(Processor {
            name: name.to_string(),
            self_link: format!("{API}/+processors/{name}"),
        })
    }

    async fn distro_series(&self, codename: &str) -> ClientResult<DistroSeries> {
        Ok(DistroSeries {
            name: codename.to_string(),
            self_link: format!("{API}/ubuntu/{codename}"),
        })
    }

    fn distro_arch_series_link(&self, codename: &str, arch: &str) -> String {
        format!("{API}/ubuntu/{codename}/{arch}")
    }

    fn primary_archive_link(&self) -> String {
        format!("{API}/ubuntu/+archive/primary")
    }

    fn person_link(&self, name: &str) -> String {
        format!("{API}/~{name}")
    }

    async fn request_builds(&self, snap: &Snap, _params: &BuildsParams) -> ClientResult<BuildRequest> {
        let mut state = self.state();
        state.builds_requested += 1;

        let arches: Vec<String> = state.arch_scripts.iter().map(|(a, _)| a.clone()).collect();
        let mut builds = Vec::new();
        for arch in arches {
            let link = Self::spawn_build(&mut state, snap, &arch);
            builds.push(SnapBuild {
                web_link: Some(link.replace("api.launchpad.test/devel", "launchpad.test")),
                title: Some(format!("{arch} build of {} snap package", snap.name)),
                buildstate: Some("Needs building".to_string()),
                arch_tag: Some(arch.clone()),
                build_log_url: None,
                self_link: link,
            });
        }
        state.request_builds = builds;

        Ok(BuildRequest {
            self_link: format!("{}/+build-request/1", snap.self_link),
            web_link: None,
            status: "Pending".to_string(),
            error_message: None,
            builds_collection_link: Some(format!("{}/+build-request/1/builds", snap.self_link)),
        })
    }

    async fn request_build(
        &self,
        snap: &Snap,
        params: &BuildParams,
        arch: &str,
    ) -> ClientResult<BuildJob> {
        let mut state = self.state();
        state.requested.push(params.clone());
        let link = Self::spawn_build(&mut state, snap, arch);
        Ok(BuildJob::new(link, arch))
    }
}

#[async_trait]
impl BuildRepository for FakeLaunchpad {
    async fn get_build_request(&self, link: &str) -> ClientResult<BuildRequest> {
        let mut state = self.state();
        let status = match state.request_statuses.len() {
            0 if state.request_builds_fail => "Failed".to_string(),
            0 => "Completed".to_string(),
            1 => state.request_statuses[0].clone(),
            _ => state.request_statuses.pop_front().unwrap_or_default(),
        };
        Ok(BuildRequest {
            self_link: link.to_string(),
            web_link: None,
            error_message: (status == "Failed").then(|| "Unknown architecture".to_string()),
            builds_collection_link: Some(format!("{link}/builds")),
            status,
        })
    }

    async fn builds_of(&self, request: &BuildRequest) -> ClientResult<Vec<SnapBuild>> {
        let state = self.state();
        if state.builds_of_fail {
            return Err(ClientError::api_error(
                504,
                format!("Gateway Timeout for {}", request.self_link),
            ));
        }
        Ok(state.request_builds.clone())
    }

    async fn get_build(&self, link: &str) -> ClientResult<SnapBuild> {
        let id = build_id_from_link(link).to_string();
        let mut state = self.state();
        let status = Self::next_status(&mut state, &id);
        let (arch, snap) = state
            .builds
            .get(&id)
            .map(|info| (info.arch.clone(), info.snap.clone()))
            .unwrap_or_default();
        Ok(SnapBuild {
            self_link: link.to_string(),
            web_link: Some(link.replace("api.launchpad.test/devel", "launchpad.test")),
            title: Some(format!("{arch} build of {snap} snap package")),
            buildstate: Some(status),
            build_log_url: Some(log_url(&snap, &arch, &id)),
            arch_tag: Some(arch),
        })
    }

    async fn build_summaries(&self, snap: &Snap, build_ids: &[&str]) -> ClientResult<BuildSummaries> {
        let mut state = self.state();
        let mut summaries = BuildSummaries::default();

        for id in build_ids {
            let arch = state
                .builds
                .get(*id)
                .map(|info| info.arch.clone())
                .unwrap_or_default();

            if let Some(remaining) = state.summary_failures.get_mut(&arch)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(ClientError::api_error(504, "Gateway Time-out"));
            }

            let status = Self::next_status(&mut state, id);
            summaries.builds.insert(
                id.to_string(),
                BuildSummary {
                    status,
                    build_log_url: Some(log_url(&snap.name, &arch, id)),
                },
            );
        }

        Ok(summaries)
    }

    async fn file_urls(&self, build_link: &str) -> ClientResult<Vec<String>> {
        Ok(self
            .state()
            .file_urls
            .get(build_link)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl FileRepository for FakeLaunchpad {
    async fn download_to(&self, url: &str, path: &Path) -> ClientResult<u64> {
        let bytes = self.fetch(url)?;
        std::fs::write(path, &bytes)?;
        Ok(bytes.len() as u64)
    }

    async fn fetch_gzip_text(&self, url: &str) -> ClientResult<String> {
        lpci_client::gunzip_text(&self.fetch(url)?)
    }
}

#[derive(Default)]
struct VcsState {
    branch: String,
    head_tags: Vec<String>,
    /// Tags on commits other than HEAD
    older_tags: Vec<String>,
    remote_tags: Vec<String>,
    fail_push: bool,
    fail_delete: bool,
    events: Vec<String>,
}

/// In-memory git checkout with an `origin` remote
#[derive(Clone, Default)]
pub struct FakeVcs {
    state: Arc<Mutex<VcsState>>,
}

impl FakeVcs {
    pub fn new(branch: &str) -> Self {
        let vcs = Self::default();
        vcs.state.lock().unwrap().branch = branch.to_string();
        vcs
    }

    pub fn add_head_tag(&self, tag: &str) {
        self.state.lock().unwrap().head_tags.push(tag.to_string());
    }

    pub fn add_older_tag(&self, tag: &str) {
        self.state.lock().unwrap().older_tags.push(tag.to_string());
    }

    pub fn fail_push(&self) {
        self.state.lock().unwrap().fail_push = true;
    }

    /// Deleting tags, locally or on the remote, is rejected
    pub fn fail_delete(&self) {
        self.state.lock().unwrap().fail_delete = true;
    }

    pub fn head_tags(&self) -> Vec<String> {
        self.state.lock().unwrap().head_tags.clone()
    }

    pub fn remote_tags(&self) -> Vec<String> {
        self.state.lock().unwrap().remote_tags.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }
}

impl VcsRepository for FakeVcs {
    fn current_branch(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().branch.clone())
    }

    fn tags_at_head(&self) -> Result<Vec<String>> {
        Ok(self.head_tags())
    }

    /// Supports the single `*` of the patterns build tags are listed with
    fn tags_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let (prefix, suffix) = pattern.split_once('*').unwrap_or((pattern, ""));
        Ok(state
            .older_tags
            .iter()
            .chain(&state.head_tags)
            .filter(|tag| {
                tag.len() >= prefix.len() + suffix.len()
                    && tag.starts_with(prefix)
                    && tag.ends_with(suffix)
            })
            .cloned()
            .collect())
    }

    fn create_tag(&self, tag: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(format!("tag {tag}"));
        state.head_tags.push(tag.to_string());
        Ok(())
    }

    fn push_tag(&self, tag: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_push {
            return Err(WorkflowError::Vcs {
                command: format!("push origin {tag}"),
                message: "remote rejected".to_string(),
            });
        }
        state.events.push(format!("push {tag}"));
        state.remote_tags.push(tag.to_string());
        Ok(())
    }

    fn delete_remote_tag(&self, tag: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete {
            return Err(WorkflowError::Vcs {
                command: format!("push origin :{tag}"),
                message: "remote rejected".to_string(),
            });
        }
        state.events.push(format!("push :{tag}"));
        state.remote_tags.retain(|t| t != tag);
        Ok(())
    }

    fn delete_tag(&self, tag: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(format!("tag --delete {tag}"));
        state.head_tags.retain(|t| t != tag);
        Ok(())
    }
}

/// Manifest source returning a fixed `dpkg.yaml`
pub struct FakeManifests {
    yaml: String,
}

impl FakeManifests {
    pub fn new(yaml: &str) -> Self {
        Self {
            yaml: yaml.to_string(),
        }
    }
}

impl ManifestSource for FakeManifests {
    fn fetch_manifest(&self, _base: &str, _work_dir: &Path) -> Result<Manifest> {
        Ok(Manifest::from_yaml(&self.yaml)?)
    }
}
