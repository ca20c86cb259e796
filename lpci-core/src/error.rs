//! Error types for lpci core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while interpreting package indexes and manifests
#[derive(Debug, Error)]
pub enum Error {
    /// A package record carried a name without a version or vice versa
    #[error("parse error, one of package ({package}) or version ({version}) is empty")]
    BlankField { package: String, version: String },

    /// A manifest package is absent from every package index
    #[error("package {0} not found in the archive")]
    PackageNotIndexed(String),

    /// A manifest entry is not of the form `name=version`
    #[error("malformed manifest entry: {0}")]
    ManifestEntry(String),

    /// The manifest document could not be decoded
    #[error("invalid manifest: {0}")]
    Manifest(#[from] serde_yaml::Error),

    /// Reading an index stream failed
    #[error("failed to read package index: {0}")]
    Io(#[from] std::io::Error),
}
