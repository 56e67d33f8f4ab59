//! Per-patch geometric primitives: cell membership, area, perimeter and
//! centroid.
//!
//! Perimeter counts every cell side that faces a different class or a
//! no-data cell. A vertical side contributes `y_res`, a horizontal side
//! `x_res`. Sides on the outer landscape boundary count only when
//! `count_boundary` is set, so with the default a patch touching the image
//! edge reports less than its geometric outline. A single-cell patch always
//! reports its full outline of four sides.
//!
//! Every patch also carries its full outline (`outline_edges`,
//! `outline_m`), which counts boundary sides regardless of the option.
//! Shape indices are measured on the outline.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::connectivity::{neighbour_index, ROOK_OFFSETS};
use crate::error::{LandscapeError, Result};
use crate::grid::{m2_to_ha, ClassId, Grid};
use crate::labeling::{PatchId, PatchLabels, NO_PATCH};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerimeterOptions {
    /// Count sides on the landscape's outer boundary as perimeter.
    pub count_boundary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patch {
    pub id: PatchId,
    pub class: ClassId,
    /// Member cells as row-major offsets, ascending.
    #[serde(skip)]
    pub cells: Vec<usize>,
    pub n_cells: usize,
    pub area_m2: f64,
    /// Perimeter in cell-side units.
    pub n_edges: usize,
    pub perimeter_m: f64,
    /// Full outline in cell-side units, landscape boundary included.
    pub outline_edges: usize,
    pub outline_m: f64,
    /// Mean of member cell centres, `(x, y)` in metres.
    pub centroid: (f64, f64),
}

impl Patch {
    pub fn area_ha(&self) -> f64 {
        m2_to_ha(self.area_m2)
    }
}

/// All patches of a labelled grid, indexed by patch id.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchTable {
    patches: Vec<Patch>,
    labels: PatchLabels,
    x_res: f64,
    y_res: f64,
    options: PerimeterOptions,
}

impl PatchTable {
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn get(&self, id: PatchId) -> Option<&Patch> {
        let i = (id as usize).checked_sub(1)?;
        self.patches.get(i)
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Patch> {
        self.patches.iter()
    }

    pub fn of_class(&self, class: ClassId) -> impl Iterator<Item = &Patch> {
        self.patches.iter().filter(move |p| p.class == class)
    }

    pub fn labels(&self) -> &PatchLabels {
        &self.labels
    }

    pub fn resolution(&self) -> (f64, f64) {
        (self.x_res, self.y_res)
    }

    pub fn options(&self) -> PerimeterOptions {
        self.options
    }
}

#[derive(Default)]
struct Accumulator {
    cells: Vec<usize>,
    sum_x: f64,
    sum_y: f64,
    n_edges: usize,
    perimeter_m: f64,
    outline_edges: usize,
    outline_m: f64,
}

/// Compute cell count, area, perimeter and centroid of every labelled patch.
pub fn patch_table(
    grid: &Grid,
    labels: PatchLabels,
    options: PerimeterOptions,
) -> Result<PatchTable> {
    let (width, height) = (grid.width(), grid.height());
    if labels.width() != width || labels.height() != height {
        return Err(LandscapeError::invalid_grid(format!(
            "labels are {}x{}, grid is {width}x{height}",
            labels.width(),
            labels.height()
        )));
    }

    let (x_res, y_res) = (grid.x_res(), grid.y_res());
    let mut acc: Vec<Accumulator> = (0..labels.n_patches()).map(|_| Accumulator::default()).collect();

    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            let label = labels.label_at(idx);
            if label == NO_PATCH {
                continue;
            }
            let class = grid.at(idx);
            let a = &mut acc[label as usize - 1];
            a.cells.push(idx);
            let (x, y) = grid.cell_center(row, col);
            a.sum_x += x;
            a.sum_y += y;

            for &offset in &ROOK_OFFSETS {
                let (on_outline, counted) = match neighbour_index(row, col, offset, width, height) {
                    None => (true, options.count_boundary),
                    Some(n) => {
                        let differs = grid.at(n) != class;
                        (differs, differs)
                    }
                };
                // Vertical sides (W/E neighbours) run along y.
                let len = if offset.0 == 0 { y_res } else { x_res };
                if on_outline {
                    a.outline_edges += 1;
                    a.outline_m += len;
                }
                if counted {
                    a.n_edges += 1;
                    a.perimeter_m += len;
                }
            }
        }
    }

    let mut patches = Vec::with_capacity(acc.len());
    for (id, a) in labels.ids().zip(acc) {
        let n_cells = a.cells.len();
        if n_cells == 0 {
            return Err(LandscapeError::EmptyPatch(id));
        }
        let class = labels.class_of(id).ok_or(LandscapeError::EmptyPatch(id))?;
        let (n_edges, perimeter_m) = if n_cells == 1 {
            (4, 2.0 * (x_res + y_res))
        } else {
            (a.n_edges, a.perimeter_m)
        };

        patches.push(Patch {
            id,
            class,
            n_cells,
            area_m2: n_cells as f64 * grid.cell_area_m2(),
            n_edges,
            perimeter_m,
            outline_edges: a.outline_edges,
            outline_m: a.outline_m,
            centroid: (a.sum_x / n_cells as f64, a.sum_y / n_cells as f64),
            cells: a.cells,
        });
    }

    debug!(
        "patch table: {} patches, count_boundary = {}",
        patches.len(),
        options.count_boundary
    );

    Ok(PatchTable { patches, labels, x_res, y_res, options })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::Connectivity;
    use crate::grid::build_grid;
    use crate::labeling::label_patches;
    use crate::neutral::{fbm_landscape, random_landscape, with_missing_cells};
    use approx::assert_relative_eq;

    fn grid_from(rows: &[&[i64]], x_res: f64, y_res: f64) -> Grid {
        let rows: Vec<Vec<Option<i64>>> = rows
            .iter()
            .map(|r| r.iter().map(|&v| (v >= 0).then_some(v)).collect())
            .collect();
        build_grid(&rows, x_res, y_res).unwrap()
    }

    fn table(grid: &Grid, conn: Connectivity, count_boundary: bool) -> PatchTable {
        let labels = label_patches(grid, conn).unwrap();
        patch_table(grid, labels, PerimeterOptions { count_boundary }).unwrap()
    }

    fn l_shape() -> Grid {
        grid_from(
            &[
                &[1, 1, 1, 1, 1],
                &[1, 2, 1, 1, 1],
                &[1, 2, 1, 1, 1],
                &[1, 2, 2, 2, 1],
                &[1, 1, 1, 1, 1],
            ],
            10.0,
            10.0,
        )
    }

    #[test]
    fn l_shape_matches_manual_count() {
        let t = table(&l_shape(), Connectivity::Queen, false);
        assert_eq!(t.len(), 2);

        let background = t.get(1).unwrap();
        assert_eq!(background.class, 1);
        assert_eq!(background.n_cells, 20);

        let l = t.get(2).unwrap();
        assert_eq!(l.class, 2);
        assert_eq!(l.n_cells, 5);
        assert_relative_eq!(l.area_m2, 500.0);
        assert_relative_eq!(l.area_ha(), 0.05);
        // 5 cells * 4 sides - 2 * 4 shared sides.
        assert_eq!(l.n_edges, 12);
        assert_relative_eq!(l.perimeter_m, 120.0);
        assert_relative_eq!(l.centroid.0, 21.0);
        assert_relative_eq!(l.centroid.1, 21.0);

        // Background only borders the L when the boundary is excluded.
        assert_eq!(background.n_edges, 12);
        assert_eq!(background.outline_edges, 12 + 20);
        assert_relative_eq!(background.outline_m, 320.0);
        assert_eq!(l.outline_edges, 12);
    }

    #[test]
    fn boundary_option_adds_outer_sides() {
        let t = table(&l_shape(), Connectivity::Queen, true);
        let background = t.get(1).unwrap();
        assert_eq!(background.n_edges, 12 + 20);
        assert_relative_eq!(background.perimeter_m, 320.0);
        // The L does not touch the boundary.
        assert_eq!(t.get(2).unwrap().n_edges, 12);
    }

    #[test]
    fn unequal_resolution_perimeter() {
        let grid = grid_from(&[&[1, 1, 2]], 10.0, 20.0);

        let t = table(&grid, Connectivity::Rook, false);
        let pair = t.get(1).unwrap();
        // Only the east side of the second cell faces class 2: a vertical side.
        assert_eq!(pair.n_edges, 1);
        assert_relative_eq!(pair.perimeter_m, 20.0);
        assert_relative_eq!(pair.area_m2, 400.0);

        let t = table(&grid, Connectivity::Rook, true);
        let pair = t.get(1).unwrap();
        assert_eq!(pair.n_edges, 6);
        // Top and bottom: 4 * x_res. West and east: 2 * y_res.
        assert_relative_eq!(pair.perimeter_m, 80.0);
    }

    #[test]
    fn single_cell_patch_has_full_outline() {
        let lonely = grid_from(&[&[3]], 10.0, 20.0);
        for count_boundary in [false, true] {
            let t = table(&lonely, Connectivity::Rook, count_boundary);
            let p = t.get(1).unwrap();
            assert_eq!(p.n_edges, 4);
            assert_relative_eq!(p.perimeter_m, 60.0);
        }

        let corner = grid_from(&[&[2, 1], &[1, 1]], 10.0, 20.0);
        let t = table(&corner, Connectivity::Rook, false);
        assert_relative_eq!(t.get(1).unwrap().perimeter_m, 60.0);
    }

    #[test]
    fn missing_neighbours_are_perimeter() {
        let grid = grid_from(&[&[-1, -1, -1], &[-1, 1, 1], &[-1, -1, -1]], 1.0, 1.0);
        let t = table(&grid, Connectivity::Rook, false);
        let p = t.get(1).unwrap();
        // East side of the right cell is the landscape boundary.
        assert_eq!(p.n_edges, 5);
    }

    #[test]
    fn areas_sum_to_valid_cells() {
        for seed in 0..6 {
            let grid = with_missing_cells(&random_landscape(31, 19, 4, seed).unwrap(), 0.1, seed).unwrap();
            assert!(grid.n_valid_cells() < grid.n_cells());
            for conn in [Connectivity::Rook, Connectivity::Queen] {
                let t = table(&grid, conn, false);
                let cells: usize = t.iter().map(|p| p.n_cells).sum();
                assert_eq!(cells, grid.n_valid_cells());
                let area: f64 = t.iter().map(|p| p.area_m2).sum();
                assert_relative_eq!(area, grid.valid_area_m2(), max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn uniform_grid_area_is_whole_landscape() {
        let grid = grid_from(&[&[1, 1, 1], &[1, 1, 1], &[1, 1, 1]], 30.0, 10.0);
        let t = table(&grid, Connectivity::Rook, false);
        assert_eq!(t.len(), 1);
        assert_relative_eq!(t.get(1).unwrap().area_m2, 9.0 * 300.0);
        assert_eq!(t.get(1).unwrap().n_edges, 0);
        assert_eq!(t.get(1).unwrap().outline_edges, 12);
        // Top and bottom: 6 * 30 m. West and east: 6 * 10 m.
        assert_relative_eq!(t.get(1).unwrap().outline_m, 240.0);
    }

    #[test]
    fn member_cells_match_labels() {
        let grid = fbm_landscape(24, 24, 3, 11).unwrap();
        let t = table(&grid, Connectivity::Queen, false);
        for p in t.iter() {
            assert!(p.cells.windows(2).all(|w| w[0] < w[1]));
            assert!(p.cells.iter().all(|&i| t.labels().label_at(i) == p.id));
            assert!(p.cells.iter().all(|&i| grid.at(i) == Some(p.class)));
        }
    }

    #[test]
    fn mismatched_labels_rejected() {
        let small = grid_from(&[&[1, 1]], 1.0, 1.0);
        let big = grid_from(&[&[1, 1], &[1, 1]], 1.0, 1.0);
        let labels = label_patches(&small, Connectivity::Rook).unwrap();
        assert!(matches!(
            patch_table(&big, labels, PerimeterOptions::default()),
            Err(LandscapeError::InvalidGrid { .. })
        ));
    }
}
