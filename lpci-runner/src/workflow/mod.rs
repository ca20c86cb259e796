//! Workflows
//!
//! The two entry points of the runner:
//! - [`BaseWorkflow`]: rebuild a base image when its packages or its git
//!   branch moved on
//! - [`SnapWorkflow`]: build a snap for a set of architectures and collect
//!   the results

use std::sync::Arc;

use crate::repository::{BuildRepository, FileRepository, RecipeRepository};

mod base;
mod snap;

pub use base::{BaseOptions, BaseOutcome, BaseWorkflow, parse_series};
pub use snap::{SnapOptions, SnapWorkflow};

/// The Launchpad-facing repositories a workflow runs against
#[derive(Clone)]
pub struct LaunchpadRepositories {
    pub recipes: Arc<dyn RecipeRepository>,
    pub builds: Arc<dyn BuildRepository>,
    pub files: Arc<dyn FileRepository>,
}

impl LaunchpadRepositories {
    /// Uses one implementation for all three roles
    pub fn shared<R>(repository: R) -> Self
    where
        R: RecipeRepository + BuildRepository + FileRepository + 'static,
    {
        let repository = Arc::new(repository);
        Self {
            recipes: repository.clone(),
            builds: repository.clone(),
            files: repository,
        }
    }
}
