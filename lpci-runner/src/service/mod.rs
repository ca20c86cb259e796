//! Service layer
//!
//! Services contain the business logic of the workflows. They orchestrate
//! repositories to compute package versions, decide on rebuilds, request
//! builds and reconcile their results.

mod detector;
mod oracle;
mod reconcile;
mod trigger;

// Re-export traits
pub use detector::RebuildPolicy;

// Re-export implementations
pub use detector::{ChangeDetector, GitTagPolicy, PackageDriftPolicy};
pub use oracle::{VersionOracle, merge_index};
pub use reconcile::{ReconcileMode, ReconcileOptions, Reconciler, SNAP_EXTENSION};
pub use trigger::{
    BuildTrigger, FALLBACK_ARCH, PreparedRecipe, RECIPE_OWNER, RecipeSource, SnapTarget,
    TriggerOutcome, VALID_ARCHES, ephemeral_recipe_name, remove_build_tag,
};
