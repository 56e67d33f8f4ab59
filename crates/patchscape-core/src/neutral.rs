//! Neutral landscape models: synthetic categorical grids with known
//! statistical structure, used to exercise the patch engine without a raster
//! reader.
//!
//! - `random_landscape`: every cell drawn independently and uniformly.
//! - `fbm_landscape`: fractal Brownian surface cut into equal-frequency
//!   classes, giving spatially clumped patches.
//! - `with_missing_cells`: punches random no-data holes into either.
use noise::{NoiseFn, Perlin};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{LandscapeError, Result};
use crate::grid::{checked_cells, ClassId, Grid};

/// Default cell size of synthetic grids (metres).
pub const NEUTRAL_RES_M: f64 = 30.0;

/// Octaves summed by `fbm_landscape`.
const FBM_OCTAVES: u32 = 4;

/// Surface roughness of `fbm_landscape`; higher values give smoother, more
/// aggregated classes.
const FBM_HURST: f64 = 0.8;

/// Uniform random classes `0..n_classes`.
pub fn random_landscape(
    width: usize,
    height: usize,
    n_classes: usize,
    seed: u64,
) -> Result<Grid> {
    check_classes(n_classes)?;
    let n_cells = checked_cells(width, height)?;
    let mut rng = StdRng::seed_from_u64(seed ^ 0x2C1B_3C6D_84F7_A9E5);
    let data = (0..n_cells)
        .map(|_| Some(rng.gen_range(0..n_classes) as ClassId))
        .collect();
    Grid::new(width, height, data, NEUTRAL_RES_M, NEUTRAL_RES_M)
}

/// Fractal Brownian surface classified into `n_classes` classes of (near)
/// equal cell count. Class 0 holds the lowest surface values.
pub fn fbm_landscape(
    width: usize,
    height: usize,
    n_classes: usize,
    seed: u64,
) -> Result<Grid> {
    check_classes(n_classes)?;
    let n_cells = checked_cells(width, height)?;
    let fbm = Fbm::new((seed & 0xFFFF_FFFF) as u32, FBM_HURST, FBM_OCTAVES);

    let base_freq = 4.0 / width.max(height).max(1) as f64;
    let mut surface = Vec::with_capacity(n_cells);
    for r in 0..height {
        for c in 0..width {
            surface.push(fbm.sample(c as f64 * base_freq, r as f64 * base_freq));
        }
    }

    // Equal-frequency cut: rank every cell, class = rank * n / cells.
    let mut order: Vec<usize> = (0..surface.len()).collect();
    order.sort_by(|&a, &b| surface[a].total_cmp(&surface[b]));

    let n = surface.len().max(1);
    let mut data = vec![None; surface.len()];
    for (rank, &idx) in order.iter().enumerate() {
        data[idx] = Some((rank * n_classes / n) as ClassId);
    }
    Grid::new(width, height, data, NEUTRAL_RES_M, NEUTRAL_RES_M)
}

/// Copy of `grid` with a seeded random share `fraction` of its cells set to
/// no data.
pub fn with_missing_cells(grid: &Grid, fraction: f64, seed: u64) -> Result<Grid> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(LandscapeError::invalid_config(
            "fraction",
            fraction,
            "missing-cell fraction must lie in [0, 1]",
        ));
    }
    let mut rng = StdRng::seed_from_u64(seed ^ 0x7F4A_7C15_9E37_79B9);
    let data = grid
        .cells()
        .iter()
        .map(|&cell| if rng.gen_bool(fraction) { None } else { cell })
        .collect();
    let (x_min, y_max) = grid.origin();
    Ok(Grid::new(grid.width(), grid.height(), data, grid.x_res(), grid.y_res())?
        .with_origin(x_min, y_max))
}

fn check_classes(n_classes: usize) -> Result<()> {
    if n_classes == 0 || n_classes > ClassId::MAX as usize {
        return Err(LandscapeError::invalid_config(
            "n_classes",
            n_classes,
            "need at least one class",
        ));
    }
    Ok(())
}

/// Sum of Perlin octaves with amplitude `2^(-H i)` and frequency `2^i`.
struct Fbm {
    hurst: f64,
    octaves: u32,
    noise: Perlin,
}

impl Fbm {
    fn new(seed: u32, hurst: f64, octaves: u32) -> Self {
        Self { hurst, octaves, noise: Perlin::new(seed) }
    }

    fn sample(&self, x: f64, y: f64) -> f64 {
        let gain = 2f64.powf(-self.hurst);
        let mut value = 0.0;
        let mut amp = 1.0;
        let mut freq = 1.0;
        for _ in 0..self.octaves {
            value += amp * self.noise.get([x * freq, y * freq]);
            amp *= gain;
            freq *= 2.0;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::Connectivity;
    use crate::labeling::label_patches;

    #[test]
    fn random_landscape_uses_every_class() {
        let grid = random_landscape(50, 50, 4, 1).unwrap();
        assert_eq!(grid.classes(), vec![0, 1, 2, 3]);
        assert_eq!(grid.n_valid_cells(), 2500);
    }

    #[test]
    fn same_seed_same_landscape() {
        assert_eq!(
            random_landscape(16, 16, 3, 9).unwrap(),
            random_landscape(16, 16, 3, 9).unwrap()
        );
        assert_eq!(
            fbm_landscape(16, 16, 3, 9).unwrap(),
            fbm_landscape(16, 16, 3, 9).unwrap()
        );
    }

    #[test]
    fn fbm_classes_have_equal_frequency() {
        let grid = fbm_landscape(40, 25, 4, 42).unwrap();
        for class in 0..4 {
            let count = grid.cells().iter().filter(|&&c| c == Some(class)).count();
            assert_eq!(count, 250, "class {class}");
        }
    }

    #[test]
    fn fbm_is_more_aggregated_than_random() {
        let fbm = fbm_landscape(64, 64, 3, 5).unwrap();
        let random = random_landscape(64, 64, 3, 5).unwrap();
        let n_fbm = label_patches(&fbm, Connectivity::Rook).unwrap().n_patches();
        let n_random = label_patches(&random, Connectivity::Rook).unwrap().n_patches();
        assert!(
            n_fbm * 4 < n_random,
            "fbm gave {n_fbm} patches, random gave {n_random}"
        );
    }

    #[test]
    fn missing_cells_are_seeded() {
        let grid = random_landscape(40, 40, 3, 2).unwrap();
        let holed = with_missing_cells(&grid, 0.1, 8).unwrap();
        assert_eq!(holed, with_missing_cells(&grid, 0.1, 8).unwrap());
        let missing = holed.n_cells() - holed.n_valid_cells();
        assert!((80..=240).contains(&missing), "{missing} missing cells");
        for (a, b) in grid.cells().iter().zip(holed.cells()) {
            assert!(b.is_none() || a == b);
        }
        assert_eq!(with_missing_cells(&grid, 0.0, 8).unwrap(), grid);
        assert!(with_missing_cells(&grid, 1.5, 8).is_err());
    }

    #[test]
    fn oversized_dimensions_rejected() {
        for generate in [random_landscape, fbm_landscape] {
            assert!(matches!(
                generate(1usize << 63, 2, 3, 0),
                Err(LandscapeError::InvalidGrid { .. })
            ));
        }
    }

    #[test]
    fn zero_classes_rejected() {
        assert!(matches!(
            random_landscape(4, 4, 0, 0),
            Err(LandscapeError::InvalidConfiguration { name: "n_classes", .. })
        ));
    }
}
