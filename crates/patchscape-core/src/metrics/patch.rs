//! Patch-level metrics (FRAGSTATS definitions) folded over the patch and
//! core tables.
//!
//! Areas are reported in hectares, lengths in metres, and the
//! perimeter-area ratio in m/m².
//!
//! `perim_m` and `para` follow the configured perimeter, so a patch on the
//! image edge loses its boundary sides unless `count_boundary` is set.
//! `shape` and `frac` are always measured on the full outline, landscape
//! boundary included, which keeps them in their ranges (`shape >= 1`,
//! `1 <= frac <= 2` for square cells). `frac` is 1.0 for single-cell patches
//! and patches of at most 1 m², where the log-log ratio is undefined.
use serde::Serialize;

use crate::core_area::CoreAnalysis;
use crate::grid::{m2_to_ha, ClassId, Grid};
use crate::labeling::PatchId;
use crate::patches::{Patch, PatchTable};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchMetrics {
    pub patch_id: PatchId,
    pub class: ClassId,
    pub n_cells: usize,
    pub area_ha: f64,
    pub perim_m: f64,
    /// Perimeter-area ratio, m/m².
    pub para: f64,
    /// Outline over the minimum outline of a patch with as many cells.
    pub shape: f64,
    pub frac: f64,
    /// Mean distance (m) of member cell centres from the centroid.
    pub gyrate_m: f64,
    pub centroid: (f64, f64),
    pub core_ha: f64,
    /// Core area as a percentage of patch area.
    pub cai: f64,
    pub ncore: usize,
}

/// Smallest possible perimeter, in cell sides, of a patch of `n_cells` cells.
pub fn min_edges(n_cells: usize) -> usize {
    let n = (n_cells as f64).sqrt().floor() as usize;
    let m = n_cells - n * n;
    if m == 0 {
        4 * n
    } else if m <= n {
        4 * n + 2
    } else {
        4 * n + 4
    }
}

pub fn compute_patch_metrics(grid: &Grid, table: &PatchTable, cores: &CoreAnalysis) -> Vec<PatchMetrics> {
    table
        .iter()
        .map(|p| {
            let (core_m2, ncore) = cores
                .for_patch(p.id)
                .map_or((0.0, 0), |c| (c.core_area_m2, c.n_disjunct_cores));

            PatchMetrics {
                patch_id: p.id,
                class: p.class,
                n_cells: p.n_cells,
                area_ha: p.area_ha(),
                perim_m: p.perimeter_m,
                para: p.perimeter_m / p.area_m2,
                shape: p.outline_edges as f64 / min_edges(p.n_cells) as f64,
                frac: fractal_dimension(p),
                gyrate_m: radius_of_gyration(grid, p),
                centroid: p.centroid,
                core_ha: m2_to_ha(core_m2),
                cai: core_m2 / p.area_m2 * 100.0,
                ncore,
            }
        })
        .collect()
}

fn fractal_dimension(p: &Patch) -> f64 {
    if p.n_cells == 1 || p.area_m2 <= 1.0 {
        return 1.0;
    }
    2.0 * (0.25 * p.outline_m).ln() / p.area_m2.ln()
}

fn radius_of_gyration(grid: &Grid, p: &Patch) -> f64 {
    let (cx, cy) = p.centroid;
    let sum: f64 = p
        .cells
        .iter()
        .map(|&idx| {
            let (x, y) = grid.cell_center(idx / grid.width(), idx % grid.width());
            ((x - cx).powi(2) + (y - cy).powi(2)).sqrt()
        })
        .sum();
    sum / p.n_cells as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::Connectivity;
    use crate::core_area::{compute_core, CoreOptions};
    use crate::grid::build_grid;
    use crate::labeling::label_patches;
    use crate::patches::{patch_table, PerimeterOptions};
    use approx::assert_relative_eq;

    fn metrics_for(rows: &[&[i64]], count_boundary: bool) -> Vec<PatchMetrics> {
        let rows: Vec<Vec<Option<i64>>> = rows
            .iter()
            .map(|r| r.iter().map(|&v| (v >= 0).then_some(v)).collect())
            .collect();
        let grid = build_grid(&rows, 10.0, 10.0).unwrap();
        let labels = label_patches(&grid, Connectivity::Queen).unwrap();
        let table = patch_table(&grid, labels, PerimeterOptions { count_boundary }).unwrap();
        let cores = compute_core(&grid, &table, CoreOptions::default()).unwrap();
        compute_patch_metrics(&grid, &table, &cores)
    }

    #[test]
    fn minimum_edges_for_small_patches() {
        assert_eq!(min_edges(1), 4);
        assert_eq!(min_edges(2), 6);
        assert_eq!(min_edges(3), 8);
        assert_eq!(min_edges(4), 8);
        assert_eq!(min_edges(5), 10);
        assert_eq!(min_edges(9), 12);
        assert_eq!(min_edges(12), 14);
    }

    #[test]
    fn l_shape_patch_metrics() {
        let m = metrics_for(
            &[
                &[1, 1, 1, 1, 1],
                &[1, 2, 1, 1, 1],
                &[1, 2, 1, 1, 1],
                &[1, 2, 2, 2, 1],
                &[1, 1, 1, 1, 1],
            ],
            false,
        );
        let l = &m[1];
        assert_eq!(l.class, 2);
        assert_relative_eq!(l.area_ha, 0.05);
        assert_relative_eq!(l.perim_m, 120.0);
        assert_relative_eq!(l.para, 0.24);
        assert_relative_eq!(l.shape, 1.2);
        assert_relative_eq!(l.frac, 2.0 * 30f64.ln() / 500f64.ln());

        let expected_gyrate =
            (2.0 * 232f64.sqrt() + 2.0 * 52f64.sqrt() + 72f64.sqrt()) / 5.0;
        assert_relative_eq!(l.gyrate_m, expected_gyrate, max_relative = 1e-12);

        assert_eq!(l.ncore, 0);
        assert_eq!(l.cai, 0.0);

        // One background cell (row 1, col 3) is clear of both the L and the boundary.
        let background = &m[0];
        // 32 outline sides against a minimum of 18 for 20 cells.
        assert_relative_eq!(background.shape, 32.0 / 18.0);
        assert_relative_eq!(background.frac, 2.0 * 80f64.ln() / 2000f64.ln());
        assert_relative_eq!(background.perim_m, 120.0);
        assert_relative_eq!(background.core_ha, 0.01);
        assert_relative_eq!(background.cai, 5.0);
        assert_eq!(background.ncore, 1);
    }

    #[test]
    fn single_cell_substitutions() {
        let m = metrics_for(&[&[1, 1], &[1, 2]], false);
        let lonely = &m[1];
        assert_eq!(lonely.n_cells, 1);
        assert_relative_eq!(lonely.shape, 1.0);
        assert_eq!(lonely.frac, 1.0);
        assert_eq!(lonely.gyrate_m, 0.0);
        assert_relative_eq!(lonely.perim_m, 40.0);
    }

    #[test]
    fn shape_indices_use_full_outline() {
        for count_boundary in [false, true] {
            let m = metrics_for(&[&[1, 1], &[1, 1]], count_boundary);
            assert_eq!(m.len(), 1);
            assert_relative_eq!(m[0].shape, 1.0);
            assert_relative_eq!(m[0].frac, 1.0, max_relative = 1e-12);
        }
        // The configured perimeter still drops boundary sides.
        assert_eq!(metrics_for(&[&[1, 1], &[1, 1]], false)[0].para, 0.0);
    }

    #[test]
    fn shape_indices_stay_in_range() {
        let grid = crate::neutral::fbm_landscape(30, 20, 4, 3).unwrap();
        let labels = label_patches(&grid, Connectivity::Queen).unwrap();
        let table = patch_table(&grid, labels, PerimeterOptions::default()).unwrap();
        let cores = compute_core(&grid, &table, CoreOptions::default()).unwrap();
        for p in compute_patch_metrics(&grid, &table, &cores) {
            assert!(p.shape >= 1.0, "patch {} shape {}", p.patch_id, p.shape);
            // Compact square patches sit exactly on 1.0, up to rounding.
            assert!(p.frac > 1.0 - 1e-9 && p.frac <= 2.0, "patch {} frac {}", p.patch_id, p.frac);
        }
    }
}
