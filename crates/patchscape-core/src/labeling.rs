//! Connected-component labelling of categorical cells into patches.
//!
//! Two-pass union-find over the flat row-major grid. The first pass hands out
//! provisional labels and records equivalences against the already-visited
//! neighbours; the second pass resolves every provisional label to its root
//! and renumbers roots densely in the order their first cell appears in the
//! row-major scan.
//!
//! Patch ids are therefore discovery-ordered. That order is an artifact of the
//! scan and is not meant to line up with other tools' numbering.

use log::debug;

use crate::connectivity::{neighbour_index, Connectivity};
use crate::error::Result;
use crate::grid::{ClassId, Grid};

/// Patch identifier, dense and 1-based.
pub type PatchId = u32;

/// Label value of cells that belong to no patch.
pub const NO_PATCH: PatchId = 0;

/// Result of labelling a grid: one patch id per cell plus the class owned by
/// each patch.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchLabels {
    labels: Vec<PatchId>,
    classes: Vec<ClassId>,
    width: usize,
    height: usize,
    connectivity: Connectivity,
}

impl PatchLabels {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn n_patches(&self) -> usize {
        self.classes.len()
    }

    /// Row-major label array; `NO_PATCH` marks no-data cells.
    pub fn labels(&self) -> &[PatchId] {
        &self.labels
    }

    #[inline]
    pub fn label_at(&self, idx: usize) -> PatchId {
        self.labels[idx]
    }

    pub fn patch_at(&self, row: usize, col: usize) -> Option<PatchId> {
        match self.labels[row * self.width + col] {
            NO_PATCH => None,
            id => Some(id),
        }
    }

    pub fn class_of(&self, id: PatchId) -> Option<ClassId> {
        let i = (id as usize).checked_sub(1)?;
        self.classes.get(i).copied()
    }

    /// Patch ids in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = PatchId> {
        1..=self.classes.len() as PatchId
    }

    pub fn n_patches_of_class(&self, class: ClassId) -> usize {
        self.classes.iter().filter(|&&c| c == class).count()
    }
}

/// Label every maximal group of same-class cells connected under
/// `connectivity`. No-data cells receive `NO_PATCH`.
pub fn label_patches(grid: &Grid, connectivity: Connectivity) -> Result<PatchLabels> {
    let (labels, n_patches) =
        label_components(grid.width(), grid.height(), connectivity, |i| grid.at(i));

    let mut classes = vec![0; n_patches];
    for (idx, &label) in labels.iter().enumerate() {
        if label != NO_PATCH {
            if let Some(class) = grid.at(idx) {
                classes[label as usize - 1] = class;
            }
        }
    }

    debug!(
        "labelled {n_patches} patches on {}x{} grid ({connectivity}-connectivity)",
        grid.width(),
        grid.height()
    );

    Ok(PatchLabels {
        labels,
        classes,
        width: grid.width(),
        height: grid.height(),
        connectivity,
    })
}

/// Generic labeller over a keyed mask.
///
/// `key(idx)` returns `None` for cells outside every component; two adjacent
/// cells join when their keys are equal. Returns the row-major label array
/// and the number of components.
pub fn label_components<K, F>(
    width: usize,
    height: usize,
    connectivity: Connectivity,
    key: F,
) -> (Vec<PatchId>, usize)
where
    K: PartialEq,
    F: Fn(usize) -> Option<K>,
{
    let mut labels = vec![NO_PATCH; width * height];
    // parent[0] is a placeholder so provisional labels index directly.
    let mut parent: Vec<PatchId> = vec![NO_PATCH];

    // Pass 1: provisional labels and equivalences.
    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            let Some(k) = key(idx) else { continue };

            let mut current = NO_PATCH;
            for &offset in connectivity.backward_offsets() {
                let Some(n_idx) = neighbour_index(row, col, offset, width, height) else {
                    continue;
                };
                let n_label = labels[n_idx];
                if n_label == NO_PATCH || key(n_idx).as_ref() != Some(&k) {
                    continue;
                }
                if current == NO_PATCH {
                    current = n_label;
                } else {
                    current = union(&mut parent, current, n_label);
                }
            }

            if current == NO_PATCH {
                current = parent.len() as PatchId;
                parent.push(current);
            }
            labels[idx] = current;
        }
    }

    // Pass 2: resolve roots, renumber in first-appearance order.
    let mut remap = vec![NO_PATCH; parent.len()];
    let mut next = NO_PATCH;
    for label in labels.iter_mut() {
        if *label == NO_PATCH {
            continue;
        }
        let root = find(&mut parent, *label) as usize;
        if remap[root] == NO_PATCH {
            next += 1;
            remap[root] = next;
        }
        *label = remap[root];
    }

    (labels, next as usize)
}

/// Root of `label` with path halving.
fn find(parent: &mut [PatchId], mut label: PatchId) -> PatchId {
    while parent[label as usize] != label {
        let grandparent = parent[parent[label as usize] as usize];
        parent[label as usize] = grandparent;
        label = grandparent;
    }
    label
}

/// Merge two sets; the smaller root becomes the parent.
fn union(parent: &mut [PatchId], a: PatchId, b: PatchId) -> PatchId {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra == rb {
        return ra;
    }
    let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
    parent[child as usize] = root;
    root
}
