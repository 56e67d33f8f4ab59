//! Class co-occurrence (adjacency) matrix.
//!
//! Counts adjacent cell pairs by class under a rook or queen neighbourhood.
//! In ordered mode every pair is seen from both cells, so an adjacency
//! between A and B adds one to `(A, B)` and one to `(B, A)`. In unordered mode
//! each pair is counted once. Pairs involving a no-data cell are skipped;
//! pairs with the landscape boundary are counted against
//! `AdjacencyLabel::Boundary` when `count_boundary` is set.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::connectivity::{neighbour_index, Connectivity};
use crate::error::Result;
use crate::grid::{ClassId, Grid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AdjacencyLabel {
    Class(ClassId),
    Boundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjacencyOptions {
    pub neighbourhood: Connectivity,
    pub ordered: bool,
    pub count_boundary: bool,
}

impl Default for AdjacencyOptions {
    fn default() -> Self {
        Self {
            neighbourhood: Connectivity::Rook,
            ordered: true,
            count_boundary: false,
        }
    }
}

/// Square count matrix over the classes present (ascending), followed by
/// `Boundary` when boundary pairs were counted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjacencyMatrix {
    labels: Vec<AdjacencyLabel>,
    /// Row-major `labels.len()²` counts.
    counts: Vec<u64>,
    ordered: bool,
}

impl AdjacencyMatrix {
    pub fn labels(&self) -> &[AdjacencyLabel] {
        &self.labels
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    pub fn size(&self) -> usize {
        self.labels.len()
    }

    /// Count for the pair `(a, b)`. Unordered matrices answer symmetrically.
    pub fn get(&self, a: AdjacencyLabel, b: AdjacencyLabel) -> u64 {
        let (Some(i), Some(j)) = (self.position(a), self.position(b)) else {
            return 0;
        };
        let (i, j) = if self.ordered { (i, j) } else { (i.min(j), i.max(j)) };
        self.counts[i * self.labels.len() + j]
    }

    /// Shorthand for a class/class pair.
    pub fn classes(&self, a: ClassId, b: ClassId) -> u64 {
        self.get(AdjacencyLabel::Class(a), AdjacencyLabel::Class(b))
    }

    /// Counts by matrix position, row-major.
    pub fn at(&self, i: usize, j: usize) -> u64 {
        self.counts[i * self.labels.len() + j]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn rows(&self) -> Vec<Vec<u64>> {
        self.counts.chunks(self.labels.len().max(1)).map(<[u64]>::to_vec).collect()
    }

    fn position(&self, label: AdjacencyLabel) -> Option<usize> {
        self.labels.binary_search(&label).ok()
    }
}

/// Scan every adjacent cell pair and accumulate class co-occurrence counts.
pub fn build_adjacency_matrix(grid: &Grid, options: AdjacencyOptions) -> Result<AdjacencyMatrix> {
    let classes = grid.classes();
    let mut labels: Vec<AdjacencyLabel> =
        classes.iter().map(|&c| AdjacencyLabel::Class(c)).collect();
    if options.count_boundary {
        labels.push(AdjacencyLabel::Boundary);
    }
    let n = labels.len();
    let boundary = n.saturating_sub(1);

    // Matrix position of every cell's class.
    let position: Vec<Option<usize>> = grid
        .cells()
        .iter()
        .map(|cell| cell.and_then(|c| classes.binary_search(&c).ok()))
        .collect();

    let (width, height) = (grid.width(), grid.height());
    let mut counts = vec![0u64; n * n];

    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            let Some(a) = position[idx] else { continue };
            for &offset in options.neighbourhood.offsets() {
                match neighbour_index(row, col, offset, width, height) {
                    Some(n_idx) => {
                        let Some(b) = position[n_idx] else { continue };
                        if options.ordered {
                            counts[a * n + b] += 1;
                        } else if idx < n_idx {
                            counts[a.min(b) * n + a.max(b)] += 1;
                        }
                    }
                    None if options.count_boundary => {
                        counts[a * n + boundary] += 1;
                        if options.ordered {
                            counts[boundary * n + a] += 1;
                        }
                    }
                    None => {}
                }
            }
        }
    }

    debug!(
        "adjacency matrix: {n} labels, {} pairs ({}-neighbourhood, ordered = {})",
        counts.iter().sum::<u64>(),
        options.neighbourhood,
        options.ordered
    );

    Ok(AdjacencyMatrix { labels, counts, ordered: options.ordered })
}
