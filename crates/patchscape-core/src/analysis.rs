//! Analysis orchestrator: runs every stage over one grid, in order.
//!
//! Stage order:
//!   1. Patch labeling
//!   2. Patch table
//!   3. Core areas
//!   4. Adjacency matrix
//!   5. Patch, class and landscape metrics
//!
//! `analyze_layers` applies the same configuration to independent layers,
//! in parallel with the `threading` feature.
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::adjacency::{build_adjacency_matrix, AdjacencyMatrix, AdjacencyOptions};
use crate::connectivity::Connectivity;
use crate::core_area::{compute_core, CoreOptions, DisjunctCore};
use crate::error::{LandscapeError, Result};
use crate::grid::Grid;
use crate::labeling::label_patches;
use crate::metrics::{
    compute_class_metrics, compute_landscape_metrics, compute_patch_metrics, ClassMetrics,
    LandscapeMetrics, PatchMetrics,
};
use crate::patches::{patch_table, PerimeterOptions};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Everything that parameterises one analysis run.
/// Missing JSON fields fall back to the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Patch delineation rule, 4 or 8. Default 8.
    pub connectivity: Connectivity,
    /// Count landscape-boundary sides as perimeter and edge. Default false.
    pub count_boundary: bool,
    pub core: CoreOptions,
    pub adjacency: AdjacencyOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Queen,
            count_boundary: false,
            core: CoreOptions::default(),
            adjacency: AdjacencyOptions::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LandscapeError::invalid_config("config", "<json>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.core.validate()
    }

    pub fn perimeter(&self) -> PerimeterOptions {
        PerimeterOptions { count_boundary: self.count_boundary }
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Full output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandscapeReport {
    pub width: usize,
    pub height: usize,
    /// `(x_res, y_res)` in metres.
    pub resolution: (f64, f64),
    pub config: AnalysisConfig,
    pub patches: Vec<PatchMetrics>,
    pub disjunct_cores: Vec<DisjunctCore>,
    pub classes: Vec<ClassMetrics>,
    pub landscape: LandscapeMetrics,
    pub adjacency: AdjacencyMatrix,
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct LandscapeAnalyzer {
    config: AnalysisConfig,
}

impl LandscapeAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every stage over `grid`. Fails before any work on an invalid
    /// configuration; no partial report is ever returned.
    pub fn analyze(&self, grid: &Grid) -> Result<LandscapeReport> {
        let config = self.config;
        config.validate()?;

        // ── 1. Labeling ─────────────────────────────────────────────────────
        let labels = label_patches(grid, config.connectivity)?;

        // ── 2. Patch table ──────────────────────────────────────────────────
        let table = patch_table(grid, labels, config.perimeter())?;

        // ── 3. Core areas ───────────────────────────────────────────────────
        let cores = compute_core(grid, &table, config.core)?;

        // ── 4. Adjacency ────────────────────────────────────────────────────
        let adjacency = build_adjacency_matrix(grid, config.adjacency)?;

        // ── 5. Metrics ──────────────────────────────────────────────────────
        let patches = compute_patch_metrics(grid, &table, &cores);
        let classes = compute_class_metrics(grid, &table, &cores)?;
        let landscape = compute_landscape_metrics(grid, &table, &adjacency)?;
        debug!(
            "metrics: {} patch rows, {} class rows",
            patches.len(),
            classes.len()
        );

        info!(
            "analysed {}x{} grid: {} patches in {} classes, {} core cells in {} disjunct cores",
            grid.width(),
            grid.height(),
            table.len(),
            landscape.pr,
            cores.total_core_cells(),
            cores.disjunct_cores.len()
        );

        Ok(LandscapeReport {
            width: grid.width(),
            height: grid.height(),
            resolution: (grid.x_res(), grid.y_res()),
            config,
            patches,
            disjunct_cores: cores.disjunct_cores,
            classes,
            landscape,
            adjacency,
        })
    }

    /// Analyse independent layers with the same configuration. The first
    /// failing layer fails the whole call.
    pub fn analyze_layers(&self, grids: &[Grid]) -> Result<Vec<LandscapeReport>> {
        use crate::maybe_rayon::*;

        self.config.validate()?;
        grids
            .into_par_iter()
            .enumerate()
            .map(|(i, grid)| {
                trace!("layer {i}: start");
                self.analyze(grid)
            })
            .collect()
    }
}

impl Default for LandscapeAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

pub fn analyze(grid: &Grid, config: &AnalysisConfig) -> Result<LandscapeReport> {
    LandscapeAnalyzer::new(*config).analyze(grid)
}

pub fn analyze_layers(grids: &[Grid], config: &AnalysisConfig) -> Result<Vec<LandscapeReport>> {
    LandscapeAnalyzer::new(*config).analyze_layers(grids)
}

// ── Unit tests ────────────────────────────────────────────────────────────────
