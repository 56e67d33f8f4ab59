//! Class-level metrics.
//!
//! Aggregation indices use rook like-adjacencies regardless of the analysis
//! neighbourhood, matching FRAGSTATS:
//! - `pladj`: like adjacencies as a percentage of all adjacencies of the
//!   class (ordered, double-counted), boundary excluded.
//! - `ai`: like adjacencies (single-counted) over the maximum possible for
//!   the class area. `None` when that maximum is zero (single-cell classes).
use serde::Serialize;

use super::edges::edge_totals;
use crate::adjacency::{build_adjacency_matrix, AdjacencyMatrix, AdjacencyOptions};
use crate::connectivity::Connectivity;
use crate::core_area::CoreAnalysis;
use crate::error::Result;
use crate::grid::{m2_to_ha, ClassId, Grid};
use crate::patches::PatchTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class: ClassId,
    pub np: usize,
    pub ca_ha: f64,
    /// Percentage of the (non-missing) landscape.
    pub pland: f64,
    pub te_m: f64,
    /// Edge density, m/ha.
    pub ed: f64,
    /// Largest patch as a percentage of the landscape.
    pub lpi: f64,
    pub tca_ha: f64,
    pub cpland: f64,
    pub ndca: usize,
    pub pladj: Option<f64>,
    pub ai: Option<f64>,
}

/// Maximum number of single-counted like adjacencies for a class of
/// `n_cells` cells (the most compact arrangement).
pub fn max_like_adjacencies(n_cells: usize) -> usize {
    let n = (n_cells as f64).sqrt().floor() as usize;
    let m = n_cells - n * n;
    let square = 2 * n * n.saturating_sub(1);
    if m == 0 {
        square
    } else if m <= n {
        square + 2 * m - 1
    } else {
        square + 2 * m - 2
    }
}

pub fn compute_class_metrics(
    grid: &Grid,
    table: &PatchTable,
    cores: &CoreAnalysis,
) -> Result<Vec<ClassMetrics>> {
    let ta_m2 = grid.valid_area_m2();
    let ta_ha = m2_to_ha(ta_m2);
    let edges = edge_totals(grid, table.options().count_boundary);
    let rook = build_adjacency_matrix(
        grid,
        AdjacencyOptions {
            neighbourhood: Connectivity::Rook,
            ordered: true,
            count_boundary: false,
        },
    )?;

    let metrics = grid
        .classes()
        .into_iter()
        .enumerate()
        .map(|(pos, class)| {
            let mut np = 0;
            let mut n_cells = 0;
            let mut ca_m2 = 0.0;
            let mut largest_m2: f64 = 0.0;
            for p in table.of_class(class) {
                np += 1;
                n_cells += p.n_cells;
                ca_m2 += p.area_m2;
                largest_m2 = largest_m2.max(p.area_m2);
            }

            let (tca_m2, ndca) = cores
                .patch_cores
                .iter()
                .filter(|c| c.class == class)
                .fold((0.0, 0), |(a, n), c| (a + c.core_area_m2, n + c.n_disjunct_cores));

            let te_m = edges.by_class.get(&class).copied().unwrap_or(0.0);

            ClassMetrics {
                class,
                np,
                ca_ha: m2_to_ha(ca_m2),
                pland: ca_m2 / ta_m2 * 100.0,
                te_m,
                ed: te_m / ta_ha,
                lpi: largest_m2 / ta_m2 * 100.0,
                tca_ha: m2_to_ha(tca_m2),
                cpland: tca_m2 / ta_m2 * 100.0,
                ndca,
                pladj: proportion_of_like_adjacencies(&rook, pos),
                ai: aggregation_index(&rook, pos, n_cells),
            }
        })
        .collect();

    Ok(metrics)
}

fn proportion_of_like_adjacencies(rook: &AdjacencyMatrix, pos: usize) -> Option<f64> {
    let all: u64 = (0..rook.size()).map(|k| rook.at(pos, k)).sum();
    (all > 0).then(|| rook.at(pos, pos) as f64 / all as f64 * 100.0)
}

fn aggregation_index(rook: &AdjacencyMatrix, pos: usize, n_cells: usize) -> Option<f64> {
    let max = max_like_adjacencies(n_cells);
    // Ordered matrix double-counts like adjacencies.
    let like = rook.at(pos, pos) as f64 / 2.0;
    (max > 0).then(|| like / max as f64 * 100.0)
}
