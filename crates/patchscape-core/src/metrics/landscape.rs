//! Landscape-level metrics: area/edge totals, diversity, contagion and the
//! information-theoretic complexity family (Nowosad & Stepinski 2019).
//!
//! The complexity metrics (`ent`, `condent`, `joinent`, `mutinf`,
//! `relmutinf`) read the configured co-occurrence matrix; boundary pairs are
//! dropped and an unordered matrix is symmetrised first. Logarithms are base 2.
//!
//! Contagion uses ordered rook adjacencies and natural logarithms, as in
//! FRAGSTATS. It is `None` with fewer than two classes.
use serde::Serialize;

use super::edges::edge_totals;
use crate::adjacency::{build_adjacency_matrix, AdjacencyLabel, AdjacencyMatrix, AdjacencyOptions};
use crate::connectivity::Connectivity;
use crate::error::Result;
use crate::grid::{m2_to_ha, Grid};
use crate::patches::PatchTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandscapeMetrics {
    pub ta_ha: f64,
    pub np: usize,
    pub te_m: f64,
    /// Edge density, m/ha. `None` for a landscape without valid cells.
    pub ed: Option<f64>,
    pub lpi: Option<f64>,
    /// Patch richness: number of classes present.
    pub pr: usize,
    pub shdi: f64,
    pub sidi: f64,
    pub contag: Option<f64>,
    pub ent: f64,
    pub condent: f64,
    pub joinent: f64,
    pub mutinf: f64,
    pub relmutinf: Option<f64>,
}

pub fn compute_landscape_metrics(
    grid: &Grid,
    table: &PatchTable,
    adjacency: &AdjacencyMatrix,
) -> Result<LandscapeMetrics> {
    let ta_m2 = grid.valid_area_m2();
    let ta_ha = m2_to_ha(ta_m2);
    let te_m = edge_totals(grid, table.options().count_boundary).landscape_m;
    let largest_m2 = table.iter().map(|p| p.area_m2).fold(0.0, f64::max);

    let proportions = class_proportions(grid);
    let shdi = -proportions.iter().map(|&p| p * p.ln()).sum::<f64>();
    let sidi = 1.0 - proportions.iter().map(|&p| p * p).sum::<f64>();

    let rook = build_adjacency_matrix(
        grid,
        AdjacencyOptions {
            neighbourhood: Connectivity::Rook,
            ordered: true,
            count_boundary: false,
        },
    )?;
    let contag = contagion(&rook, &proportions);

    let Complexity { ent, condent, joinent, mutinf, relmutinf } = complexity(adjacency);

    Ok(LandscapeMetrics {
        ta_ha,
        np: table.len(),
        te_m,
        ed: (ta_ha > 0.0).then(|| te_m / ta_ha),
        lpi: (ta_m2 > 0.0).then(|| largest_m2 / ta_m2 * 100.0),
        pr: proportions.len(),
        shdi,
        sidi,
        contag,
        ent,
        condent,
        joinent,
        mutinf,
        relmutinf,
    })
}

/// Share of valid cells held by each class, ascending class order.
fn class_proportions(grid: &Grid) -> Vec<f64> {
    let classes = grid.classes();
    let mut counts = vec![0usize; classes.len()];
    for class in grid.cells().iter().flatten() {
        if let Ok(i) = classes.binary_search(class) {
            counts[i] += 1;
        }
    }
    let total = grid.n_valid_cells() as f64;
    counts.into_iter().map(|c| c as f64 / total).collect()
}

fn contagion(rook: &AdjacencyMatrix, proportions: &[f64]) -> Option<f64> {
    let m = proportions.len();
    if m < 2 {
        return None;
    }
    let mut sum = 0.0;
    for (i, &p_i) in proportions.iter().enumerate() {
        let row_total: u64 = (0..m).map(|k| rook.at(i, k)).sum();
        if row_total == 0 {
            continue;
        }
        for k in 0..m {
            let g = rook.at(i, k);
            if g > 0 {
                let p = p_i * g as f64 / row_total as f64;
                sum += p * p.ln();
            }
        }
    }
    Some((1.0 + sum / (2.0 * (m as f64).ln())) * 100.0)
}

struct Complexity {
    ent: f64,
    condent: f64,
    joinent: f64,
    mutinf: f64,
    relmutinf: Option<f64>,
}

fn complexity(adjacency: &AdjacencyMatrix) -> Complexity {
    let n = adjacency
        .labels()
        .iter()
        .filter(|l| matches!(l, AdjacencyLabel::Class(_)))
        .count();

    // Directed counts over class labels only; boundary sorts last.
    let mut directed = vec![0.0f64; n * n];
    for i in 0..n {
        for j in 0..n {
            directed[i * n + j] = if adjacency.is_ordered() {
                adjacency.at(i, j) as f64
            } else {
                (adjacency.at(i, j) + adjacency.at(j, i)) as f64
            };
        }
    }
    let total: f64 = directed.iter().sum();
    if total <= 0.0 {
        return Complexity { ent: 0.0, condent: 0.0, joinent: 0.0, mutinf: 0.0, relmutinf: None };
    }

    let mut joinent = 0.0;
    let mut marginal = vec![0.0f64; n];
    for i in 0..n {
        for j in 0..n {
            let p = directed[i * n + j] / total;
            marginal[i] += p;
            if p > 0.0 {
                joinent -= p * p.log2();
            }
        }
    }
    let ent = -marginal.iter().filter(|&&p| p > 0.0).map(|&p| p * p.log2()).sum::<f64>();
    let condent = joinent - ent;
    let mutinf = ent - condent;

    Complexity {
        ent,
        condent,
        joinent,
        mutinf,
        relmutinf: (ent > 0.0).then(|| mutinf / ent),
    }
}
