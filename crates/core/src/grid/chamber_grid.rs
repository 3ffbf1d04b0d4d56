//! Two-chamber occupancy grid and its signed coordinate mapping
//!
//! Both chambers are `n×n` squares stored back to back in one flat array:
//!
//! ```text
//!            y
//!            ^
//!            |  top chamber
//!            |  x ∈ [0, n), y ∈ [0, n)
//!            |  index n*n + x + n*y
//!   ---------+--------> x
//!   bottom   |
//!   chamber  |
//!   x,y ∈ [-n, 0)
//!   index (x+n) + n*(y+n)
//! ```
//!
//! The two remaining quadrants have no cells, so the only way between the
//! chambers is the diagonal step between `(-1, -1)` and `(0, 0)`.

use crate::error::HourglassError;
use crate::MAX_CHAMBER_SIZE;

/// Flat occupancy array over the bottom and top chambers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChamberGrid {
    n: usize,
    occupied: Vec<bool>,
}

impl ChamberGrid {
    /// Create a grid with every cell empty.
    ///
    /// # Errors
    ///
    /// Returns [`HourglassError::InvalidSize`] if `n` is zero or larger than
    /// [`MAX_CHAMBER_SIZE`].
    pub fn empty(n: usize) -> Result<Self, HourglassError> {
        if n == 0 || n > MAX_CHAMBER_SIZE {
            return Err(HourglassError::InvalidSize(n));
        }

        Ok(Self {
            n,
            occupied: vec![false; 2 * n * n],
        })
    }

    /// Create a grid whose first `floor(n*n*ratio)` cells by raw index are occupied.
    ///
    /// Raw index order starts in the bottom chamber, so any ratio up to 1.0 fills
    /// only that chamber.
    ///
    /// # Errors
    ///
    /// Returns [`HourglassError::InvalidSize`] for an out-of-range `n` and
    /// [`HourglassError::InvalidFillRatio`] if `ratio` is not within `[0, 1]`.
    pub fn with_fill(n: usize, ratio: f64) -> Result<Self, HourglassError> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(HourglassError::InvalidFillRatio(ratio));
        }

        let mut grid = Self::empty(n)?;
        let filled = ((n * n) as f64 * ratio).floor() as usize;
        grid.occupied[..filled].fill(true);
        Ok(grid)
    }

    /// Chamber side length
    pub fn size(&self) -> usize {
        self.n
    }

    /// Number of cells in one chamber (`n*n`)
    pub fn chamber_len(&self) -> usize {
        self.n * self.n
    }

    /// Total number of cells across both chambers (`2*n*n`)
    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    /// Always false: a grid has at least one cell per chamber.
    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Map a signed position to its linear index, or `None` outside both chambers.
    #[inline]
    pub fn position_to_index(&self, x: i32, y: i32) -> Option<usize> {
        let n = self.n as i32;
        if (0..n).contains(&x) && (0..n).contains(&y) {
            Some(self.chamber_len() + (x + n * y) as usize)
        } else if (-n..0).contains(&x) && (-n..0).contains(&y) {
            Some(((x + n) + n * (y + n)) as usize)
        } else {
            None
        }
    }

    /// Map a linear index back to its signed position, or `None` past the end.
    #[inline]
    pub fn index_to_position(&self, index: usize) -> Option<(i32, i32)> {
        let n = self.n;
        let chamber = self.chamber_len();
        if index < chamber {
            Some((
                (index % n) as i32 - n as i32,
                (index / n) as i32 - n as i32,
            ))
        } else if index < 2 * chamber {
            let i = index - chamber;
            Some(((i % n) as i32, (i / n) as i32))
        } else {
            None
        }
    }

    /// Occupancy at a position; `None` if the position has no cell.
    pub fn get(&self, x: i32, y: i32) -> Option<bool> {
        self.position_to_index(x, y).map(|i| self.occupied[i])
    }

    /// Occupancy at a linear index; `None` past the end.
    pub fn get_index(&self, index: usize) -> Option<bool> {
        self.occupied.get(index).copied()
    }

    /// Set occupancy at a position. Positions outside both chambers are ignored.
    pub fn set(&mut self, x: i32, y: i32, value: bool) {
        if let Some(i) = self.position_to_index(x, y) {
            self.occupied[i] = value;
        }
    }

    /// Raw occupancy array, bottom chamber first
    pub fn cells(&self) -> &[bool] {
        &self.occupied
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [bool] {
        &mut self.occupied
    }

    /// Bottom chamber cells (indices `[0, n*n)`)
    pub fn bottom_cells(&self) -> &[bool] {
        &self.occupied[..self.chamber_len()]
    }

    /// Top chamber cells (indices `[n*n, 2*n*n)`)
    pub fn top_cells(&self) -> &[bool] {
        &self.occupied[self.chamber_len()..]
    }

    /// Total number of grains
    pub fn occupied_count(&self) -> usize {
        self.occupied.iter().filter(|&&b| b).count()
    }

    /// Grain counts as `(bottom, top)`
    pub fn chamber_counts(&self) -> (usize, usize) {
        let bottom = self.bottom_cells().iter().filter(|&&b| b).count();
        let top = self.top_cells().iter().filter(|&&b| b).count();
        (bottom, top)
    }
}
