//! Categorical raster model: class labels, resolutions and georeference.

use serde::Serialize;

use crate::error::{LandscapeError, Result};

/// Categorical class label of a cell.
pub type ClassId = u32;

pub const M2_PER_HECTARE: f64 = 10_000.0;

#[inline]
pub fn m2_to_ha(area_m2: f64) -> f64 {
    area_m2 / M2_PER_HECTARE
}

/// An immutable categorical raster, row-major. `None` cells are "no data".
///
/// Resolutions are metres per cell along each axis and may differ.
/// The grid is north-up: row 0 is the top edge at `y_max`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    data: Vec<Option<ClassId>>,
    width: usize,
    height: usize,
    x_res: f64,
    y_res: f64,
    x_min: f64,
    y_max: f64,
}

impl Grid {
    /// Build a grid from flat row-major data.
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<Option<ClassId>>,
        x_res: f64,
        y_res: f64,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(LandscapeError::invalid_grid(format!(
                "empty grid ({width}x{height})"
            )));
        }
        let n_cells = checked_cells(width, height)?;
        if data.len() != n_cells {
            return Err(LandscapeError::invalid_grid(format!(
                "{} cells supplied for a {width}x{height} grid",
                data.len()
            )));
        }
        check_resolution("x_res", x_res)?;
        check_resolution("y_res", y_res)?;

        Ok(Self {
            data,
            width,
            height,
            x_res,
            y_res,
            x_min: 0.0,
            y_max: height as f64 * y_res,
        })
    }

    /// Place the top-left corner of the grid at `(x_min, y_max)`.
    pub fn with_origin(mut self, x_min: f64, y_max: f64) -> Self {
        self.x_min = x_min;
        self.y_max = y_max;
        self
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn x_res(&self) -> f64 {
        self.x_res
    }

    #[inline]
    pub fn y_res(&self) -> f64 {
        self.y_res
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.x_min, self.y_max)
    }

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn cell_area_m2(&self) -> f64 {
        self.x_res * self.y_res
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<ClassId> {
        self.data[row * self.width + col]
    }

    /// Cell value by row-major offset.
    #[inline]
    pub fn at(&self, idx: usize) -> Option<ClassId> {
        self.data[idx]
    }

    pub fn cells(&self) -> &[Option<ClassId>] {
        &self.data
    }

    /// Real-world coordinate of the centre of cell `(row, col)`.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.x_min + (col as f64 + 0.5) * self.x_res,
            self.y_max - (row as f64 + 0.5) * self.y_res,
        )
    }

    /// Sorted, de-duplicated class labels present in the grid.
    pub fn classes(&self) -> Vec<ClassId> {
        let mut classes: Vec<ClassId> = self.data.iter().flatten().copied().collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    pub fn n_valid_cells(&self) -> usize {
        self.data.iter().filter(|c| c.is_some()).count()
    }

    /// Total area of all non-missing cells in square metres.
    pub fn valid_area_m2(&self) -> f64 {
        self.n_valid_cells() as f64 * self.cell_area_m2()
    }
}

/// Build a grid from raw rows as delivered by a raster reader.
///
/// Fails with `InvalidGrid` for empty or ragged input and for labels outside
/// the `ClassId` range, and with `InvalidConfiguration` for non-positive
/// resolutions.
pub fn build_grid(rows: &[Vec<Option<i64>>], x_res: f64, y_res: f64) -> Result<Grid> {
    let height = rows.len();
    let width = rows.first().map_or(0, |r| r.len());
    if height == 0 || width == 0 {
        return Err(LandscapeError::invalid_grid("no cells"));
    }

    let mut data = Vec::with_capacity(width * height);
    for (r, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(LandscapeError::invalid_grid(format!(
                "row {r} has {} cells, expected {width}",
                row.len()
            )));
        }
        for (c, &value) in row.iter().enumerate() {
            let cell = match value {
                None => None,
                Some(v) => Some(ClassId::try_from(v).map_err(|_| {
                    LandscapeError::invalid_grid(format!(
                        "class label {v} at ({r}, {c}) is not a non-negative 32-bit integer"
                    ))
                })?),
            };
            data.push(cell);
        }
    }

    Grid::new(width, height, data, x_res, y_res)
}

/// `width * height`, or `InvalidGrid` when the product does not fit in `usize`.
pub(crate) fn checked_cells(width: usize, height: usize) -> Result<usize> {
    width.checked_mul(height).ok_or_else(|| {
        LandscapeError::invalid_grid(format!("{width}x{height} grid overflows the cell index"))
    })
}

fn check_resolution(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LandscapeError::invalid_config(
            name,
            value,
            "resolution must be finite and positive",
        ))
    }
}
