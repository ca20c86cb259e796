//! lpci Runner
//!
//! The workflow engine behind the `lpci` binary.
//!
//! Architecture:
//! - Configuration: poll intervals, retry counts and the API root
//! - Repositories: Launchpad, plain downloads, git and the snap store
//! - Services: version oracle, change detector, build trigger, reconciler
//! - Scheduler: polling of build requests and builds
//! - Workflows: the base image and snap build entry points

pub mod config;
pub mod error;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Result, WorkflowError};
