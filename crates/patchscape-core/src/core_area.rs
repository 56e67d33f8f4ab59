//! Core cells and disjunct core areas.
//!
//! A cell is an *edge* cell when a rook path of at most `edge_depth` steps
//! reaches a violating position: a cell of another class, a no-data cell, or
//! (unless `consider_boundary` is set) a position outside the landscape.
//! Every other patch cell is *core*. Core detection always uses rook
//! adjacency, whatever rule delineated the patches.
//!
//! The core mask is relabelled with rook connectivity, keyed by owning patch,
//! to split each patch's core into disjunct core areas.
use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::connectivity::{neighbour_index, Connectivity, ROOK_OFFSETS};
use crate::error::{LandscapeError, Result};
use crate::grid::{m2_to_ha, ClassId, Grid};
use crate::labeling::{label_components, PatchId, PatchLabels, NO_PATCH};
use crate::patches::PatchTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreOptions {
    /// Distance in cells from a violating position within which a cell is
    /// edge rather than core. Must be at least 1.
    pub edge_depth: u32,
    /// Treat cells whose only violating neighbour is the landscape boundary
    /// as core.
    pub consider_boundary: bool,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self { edge_depth: 1, consider_boundary: false }
    }
}

impl CoreOptions {
    pub fn validate(&self) -> Result<()> {
        if self.edge_depth == 0 {
            return Err(LandscapeError::invalid_config(
                "edge_depth",
                self.edge_depth,
                "edge depth must be at least one cell",
            ));
        }
        Ok(())
    }
}

/// Core summary of one patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchCore {
    pub patch_id: PatchId,
    pub class: ClassId,
    pub n_core_cells: usize,
    pub core_area_m2: f64,
    pub n_disjunct_cores: usize,
}

impl PatchCore {
    pub fn core_area_ha(&self) -> f64 {
        m2_to_ha(self.core_area_m2)
    }
}

/// A connected group of core cells inside one patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisjunctCore {
    pub id: u32,
    pub patch_id: PatchId,
    pub class: ClassId,
    pub n_cells: usize,
    pub area_m2: f64,
}

impl DisjunctCore {
    pub fn area_ha(&self) -> f64 {
        m2_to_ha(self.area_m2)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreAnalysis {
    /// One entry per patch, in patch id order.
    pub patch_cores: Vec<PatchCore>,
    /// Disjunct core areas in discovery order.
    pub disjunct_cores: Vec<DisjunctCore>,
}

impl CoreAnalysis {
    pub fn for_patch(&self, id: PatchId) -> Option<&PatchCore> {
        let i = (id as usize).checked_sub(1)?;
        self.patch_cores.get(i)
    }

    pub fn total_core_cells(&self) -> usize {
        self.patch_cores.iter().map(|c| c.n_core_cells).sum()
    }
}

/// Boolean core mask, row-major, same shape as the grid.
pub fn core_mask(grid: &Grid, labels: &PatchLabels, options: CoreOptions) -> Result<Vec<bool>> {
    options.validate()?;
    let (width, height) = (grid.width(), grid.height());
    check_shape(grid, labels)?;

    // depth[i] = rook distance to the nearest violator, 0 while unknown or
    // beyond `edge_depth`.
    let mut depth = vec![0u32; width * height];
    let mut queue = VecDeque::new();

    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            let label = labels.label_at(idx);
            if label == NO_PATCH {
                continue;
            }
            let touches_violator = ROOK_OFFSETS.iter().any(|&offset| {
                match neighbour_index(row, col, offset, width, height) {
                    None => !options.consider_boundary,
                    Some(n) => labels.label_at(n) != label,
                }
            });
            if touches_violator {
                depth[idx] = 1;
                queue.push_back(idx);
            }
        }
    }

    while let Some(idx) = queue.pop_front() {
        let d = depth[idx];
        if d >= options.edge_depth {
            continue;
        }
        let (row, col) = (idx / width, idx % width);
        let label = labels.label_at(idx);
        for &offset in &ROOK_OFFSETS {
            if let Some(n) = neighbour_index(row, col, offset, width, height) {
                if depth[n] == 0 && labels.label_at(n) == label {
                    depth[n] = d + 1;
                    queue.push_back(n);
                }
            }
        }
    }

    Ok(labels
        .labels()
        .iter()
        .zip(&depth)
        .map(|(&label, &d)| label != NO_PATCH && d == 0)
        .collect())
}

/// Core cells per patch and the disjunct core areas they form.
pub fn compute_core(grid: &Grid, table: &PatchTable, options: CoreOptions) -> Result<CoreAnalysis> {
    let labels = table.labels();
    let mask = core_mask(grid, labels, options)?;
    let (width, height) = (grid.width(), grid.height());

    let (core_labels, n_cores) = label_components(width, height, Connectivity::Rook, |i| {
        mask[i].then(|| labels.label_at(i))
    });

    let mut core_cells = vec![0usize; n_cores];
    let mut owner = vec![NO_PATCH; n_cores];
    for (idx, &core) in core_labels.iter().enumerate() {
        if core != NO_PATCH {
            core_cells[core as usize - 1] += 1;
            owner[core as usize - 1] = labels.label_at(idx);
        }
    }

    let cell_area = grid.cell_area_m2();
    let mut patch_cores: Vec<PatchCore> = table
        .iter()
        .map(|p| PatchCore {
            patch_id: p.id,
            class: p.class,
            n_core_cells: 0,
            core_area_m2: 0.0,
            n_disjunct_cores: 0,
        })
        .collect();

    let mut disjunct_cores = Vec::with_capacity(n_cores);
    for (i, (&n_cells, &patch_id)) in core_cells.iter().zip(&owner).enumerate() {
        let pc = patch_id
            .checked_sub(1)
            .and_then(|p| patch_cores.get_mut(p as usize))
            .ok_or(LandscapeError::EmptyPatch(patch_id))?;
        pc.n_core_cells += n_cells;
        pc.n_disjunct_cores += 1;
        disjunct_cores.push(DisjunctCore {
            id: i as u32 + 1,
            patch_id,
            class: pc.class,
            n_cells,
            area_m2: n_cells as f64 * cell_area,
        });
    }
    for pc in &mut patch_cores {
        pc.core_area_m2 = pc.n_core_cells as f64 * cell_area;
    }

    debug!(
        "core analysis: {} core cells in {} disjunct cores (edge_depth = {}, consider_boundary = {})",
        patch_cores.iter().map(|c| c.n_core_cells).sum::<usize>(),
        n_cores,
        options.edge_depth,
        options.consider_boundary
    );

    Ok(CoreAnalysis { patch_cores, disjunct_cores })
}

fn check_shape(grid: &Grid, labels: &PatchLabels) -> Result<()> {
    if labels.width() != grid.width() || labels.height() != grid.height() {
        return Err(LandscapeError::invalid_grid(format!(
            "labels are {}x{}, grid is {}x{}",
            labels.width(),
            labels.height(),
            grid.width(),
            grid.height()
        )));
    }
    Ok(())
}
