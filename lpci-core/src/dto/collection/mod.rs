//! Paginated collections

use serde::{Deserialize, Serialize};

/// One page of a Launchpad collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection<T> {
    #[serde(default)]
    pub total_size: Option<u64>,
    #[serde(default)]
    pub start: u64,
    #[serde(default = "Vec::new")]
    pub entries: Vec<T>,
    /// Link to the following page, absent on the last one
    #[serde(default)]
    pub next_collection_link: Option<String>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            total_size: Some(0),
            start: 0,
            entries: Vec::new(),
            next_collection_link: None,
        }
    }
}
