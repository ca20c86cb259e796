//! Scheduler layer
//!
//! Drives remote work to completion: waits for build requests to be
//! processed and for builds to reach a terminal state.

pub mod poller;

pub use poller::{BuildPoller, Probe};
