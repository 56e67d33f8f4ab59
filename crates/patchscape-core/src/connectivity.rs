//! Cell adjacency rules shared by the labeler, the core analyzer and the
//! adjacency matrix builder.

use serde::{Deserialize, Serialize};

use crate::error::LandscapeError;

/// Rook (4-neighbour) or queen (8-neighbour) adjacency.
///
/// Serialised as the integer 4 or 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Connectivity {
    Rook,
    Queen,
}

/// `(d_row, d_col)` offsets of the four rook neighbours: N, W, E, S.
pub const ROOK_OFFSETS: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

/// `(d_row, d_col)` offsets of all eight queen neighbours, row-major.
pub const QUEEN_OFFSETS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    ( 0, -1),          ( 0, 1),
    ( 1, -1), ( 1, 0), ( 1, 1),
];

impl Connectivity {
    pub fn neighbours(self) -> u8 {
        match self {
            Connectivity::Rook => 4,
            Connectivity::Queen => 8,
        }
    }

    /// Every neighbour offset under this rule.
    pub fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Rook => &ROOK_OFFSETS,
            Connectivity::Queen => &QUEEN_OFFSETS,
        }
    }

    /// Offsets of neighbours already visited by a row-major scan
    /// (W, N and, for queen, NW and NE).
    pub(crate) fn backward_offsets(self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Rook => &[(0, -1), (-1, 0)],
            Connectivity::Queen => &[(0, -1), (-1, -1), (-1, 0), (-1, 1)],
        }
    }
}

impl TryFrom<u8> for Connectivity {
    type Error = LandscapeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Connectivity::Rook),
            8 => Ok(Connectivity::Queen),
            other => Err(LandscapeError::InvalidConnectivity(other)),
        }
    }
}

impl From<Connectivity> for u8 {
    fn from(c: Connectivity) -> u8 {
        c.neighbours()
    }
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.neighbours())
    }
}

/// Row-major offset of `(row + dr, col + dc)`, or `None` outside the grid.
#[inline]
pub(crate) fn neighbour_index(
    row: usize,
    col: usize,
    (dr, dc): (isize, isize),
    width: usize,
    height: usize,
) -> Option<usize> {
    let nr = row.checked_add_signed(dr)?;
    let nc = col.checked_add_signed(dc)?;
    (nr < height && nc < width).then_some(nr * width + nc)
}
