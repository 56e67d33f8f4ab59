//! Shared edge-length totals used by class and landscape edge metrics.
//! `pub(crate)` only, not re-exported from metrics/mod.rs.

use std::collections::BTreeMap;

use crate::connectivity::{neighbour_index, ROOK_OFFSETS};
use crate::grid::{ClassId, Grid};

pub(crate) struct EdgeTotals {
    /// Edge length (m) bordering each class.
    pub by_class: BTreeMap<ClassId, f64>,
    /// Edge length (m) in the landscape, each side counted once.
    pub landscape_m: f64,
}

/// Sum the lengths of cell sides separating different classes (or a class
/// from no data), plus sides on the outer boundary when `count_boundary`.
///
/// Unlike patch perimeters, no single-cell substitution applies here: these
/// are the edges actually present in the grid.
pub(crate) fn edge_totals(grid: &Grid, count_boundary: bool) -> EdgeTotals {
    let (width, height) = (grid.width(), grid.height());
    let mut by_class: BTreeMap<ClassId, f64> = BTreeMap::new();
    let mut landscape_m = 0.0;

    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            let Some(class) = grid.at(idx) else { continue };
            let entry = by_class.entry(class).or_insert(0.0);
            for &offset in &ROOK_OFFSETS {
                let len = if offset.0 == 0 { grid.y_res() } else { grid.x_res() };
                match neighbour_index(row, col, offset, width, height) {
                    None => {
                        if count_boundary {
                            *entry += len;
                            landscape_m += len;
                        }
                    }
                    Some(n) => match grid.at(n) {
                        Some(other) if other == class => {}
                        // Seen again from the other cell; count the side once.
                        Some(_) => {
                            *entry += len;
                            if idx < n {
                                landscape_m += len;
                            }
                        }
                        None => {
                            *entry += len;
                            landscape_m += len;
                        }
                    },
                }
            }
        }
    }

    EdgeTotals { by_class, landscape_m }
}
