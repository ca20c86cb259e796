//! Configuration module
//!
//! Builds the runner configuration from the environment and the global
//! flags, and resolves paths given on the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lpci_runner::Config;

/// Loads the runner configuration, with the API root from the command line
pub fn load_config(api_root: String) -> Result<Config> {
    let mut config = Config::from_env();
    config.api_root = api_root;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Expands a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
