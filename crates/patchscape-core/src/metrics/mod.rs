//! FRAGSTATS metrics derived from the patch, core and adjacency tables.
pub mod class;
mod edges;
pub mod landscape;
pub mod patch;

pub use class::{compute_class_metrics, ClassMetrics};
pub use landscape::{compute_landscape_metrics, LandscapeMetrics};
pub use patch::{compute_patch_metrics, PatchMetrics};
