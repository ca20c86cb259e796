//! Repository layer
//!
//! Repositories abstract communication with everything outside the
//! process: the Launchpad API, plain HTTP downloads, git and the snap
//! store tooling. They provide simple, focused interfaces without any
//! business logic.
//!
//! All repositories are trait-based to enable testing with in-memory fakes.

mod launchpad;
mod manifest;
mod vcs;

// Re-export traits
pub use launchpad::{BuildRepository, FileRepository, RecipeRepository};
pub use manifest::ManifestSource;
pub use vcs::VcsRepository;

// Re-export implementations
pub use launchpad::HttpLaunchpadRepository;
pub use manifest::{StoreManifestSource, read_manifest};
pub use vcs::{GitRepository, REMOTE};
