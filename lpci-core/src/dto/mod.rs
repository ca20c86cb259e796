//! Data Transfer Objects for the Launchpad REST API
//!
//! Launchpad serves resources as JSON documents. Links to related objects
//! use a `_link` suffix and collection attributes a `_collection_link`
//! suffix. Only the fields this crate acts on are modelled; unknown fields
//! are ignored on deserialization.

pub mod build;
pub mod collection;
pub mod snap;
