//! lpci Core
//!
//! Core types and pure decision logic for the lpci build workflows.
//!
//! This crate contains:
//! - Domain types: Debian versions, build states and jobs, build tags,
//!   base-image series, manifests and rebuild policies
//! - DTOs: wire representations of Launchpad REST resources
//! - Package index parsing
//!
//! Nothing here performs I/O against the network or git; that lives in
//! `lpci-client` and `lpci-runner`.

pub mod domain;
pub mod dto;
pub mod error;
pub mod index;

pub use error::{Error, Result};
