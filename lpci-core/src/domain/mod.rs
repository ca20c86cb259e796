//! Core domain types
//!
//! The fundamental entities shared by the client, the workflow engine and
//! the CLI.

pub mod build;
pub mod manifest;
pub mod policy;
pub mod series;
pub mod tag;
pub mod version;
pub mod version_map;
