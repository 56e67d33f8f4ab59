//! Patch delineation, core-area analysis and FRAGSTATS-style landscape
//! metrics for categorical rasters.
//!
//! Pipeline: [`grid::Grid`] → [`labeling::label_patches`] →
//! [`patches::patch_table`] → [`core_area::compute_core`], with
//! [`adjacency::build_adjacency_matrix`] reading the grid directly. The
//! [`metrics`] module folds the resulting tables into patch, class and
//! landscape metrics, and [`analysis`] runs the whole chain.

pub mod adjacency;
pub mod analysis;
pub mod connectivity;
pub mod core_area;
pub mod error;
pub mod grid;
pub mod labeling;
mod maybe_rayon;
pub mod metrics;
pub mod neutral;
pub mod patches;

pub use adjacency::{build_adjacency_matrix, AdjacencyLabel, AdjacencyMatrix, AdjacencyOptions};
pub use analysis::{analyze, analyze_layers, AnalysisConfig, LandscapeAnalyzer, LandscapeReport};
pub use connectivity::Connectivity;
pub use core_area::{compute_core, core_mask, CoreAnalysis, CoreOptions, DisjunctCore, PatchCore};
pub use error::{LandscapeError, Result};
pub use grid::{build_grid, m2_to_ha, ClassId, Grid, M2_PER_HECTARE};
pub use labeling::{label_patches, PatchId, PatchLabels, NO_PATCH};
pub use patches::{patch_table, Patch, PatchTable, PerimeterOptions};
