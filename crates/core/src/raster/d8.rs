//! D8 direction codes
//!
//! Direction grids store one byte per cell:
//! ```text
//!   8  1  2
//!   7  0  3
//!   6  5  4
//! ```
//! `0` is NONE (outlet or unresolved flat), `1`-`8` run clockwise from north,
//! and [`DIR_NODATA`] marks cells that had no elevation.

use std::f64::consts::SQRT_2;

/// Direction grid nodata sentinel
pub const DIR_NODATA: u8 = 255;

/// One of the nine symbolic D8 direction codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FlowDir {
    None = 0,
    N = 1,
    NE = 2,
    E = 3,
    SE = 4,
    S = 5,
    SW = 6,
    W = 7,
    NW = 8,
}

impl FlowDir {
    /// The eight real directions in tie-break priority order.
    pub const ALL: [FlowDir; 8] = [
        FlowDir::N,
        FlowDir::NE,
        FlowDir::E,
        FlowDir::SE,
        FlowDir::S,
        FlowDir::SW,
        FlowDir::W,
        FlowDir::NW,
    ];

    /// Byte code stored in direction grids
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a stored byte; `None` for nodata or unknown codes
    pub fn from_code(code: u8) -> Option<FlowDir> {
        match code {
            0 => Some(FlowDir::None),
            1..=8 => Some(FlowDir::ALL[(code - 1) as usize]),
            _ => None,
        }
    }

    /// (row, col) offset to the receiving neighbor
    pub fn offset(self) -> (isize, isize) {
        match self {
            FlowDir::None => (0, 0),
            FlowDir::N => (-1, 0),
            FlowDir::NE => (-1, 1),
            FlowDir::E => (0, 1),
            FlowDir::SE => (1, 1),
            FlowDir::S => (1, 0),
            FlowDir::SW => (1, -1),
            FlowDir::W => (0, -1),
            FlowDir::NW => (-1, -1),
        }
    }

    /// Center-to-center distance in cell units
    pub fn distance(self) -> f64 {
        match self {
            FlowDir::None => 0.0,
            dir if dir.is_diagonal() => SQRT_2,
            _ => 1.0,
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(self, FlowDir::NE | FlowDir::SE | FlowDir::SW | FlowDir::NW)
    }

    /// Neighbor of `(row, col)` in this direction, if it lies inside a
    /// `rows x cols` grid.
    pub fn step(self, row: usize, col: usize, rows: usize, cols: usize) -> Option<(usize, usize)> {
        if self == FlowDir::None {
            return None;
        }
        let (dr, dc) = self.offset();
        let nr = row.checked_add_signed(dr)?;
        let nc = col.checked_add_signed(dc)?;
        (nr < rows && nc < cols).then_some((nr, nc))
    }
}
