//! Isometric grid coordinate system.
//!
//! Maps integer grid cells `(row, col)` to world positions and back. The map
//! is an isometric diamond: moving one column east shifts a point by
//! `(+delta_x, +delta_y)`, moving one row shifts it by `(+delta_x, -delta_y)`.
//!
//! ```text
//! world.x = p00.x + (row + col) * delta_x
//! world.y = p00.y + (col - row) * delta_y
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{RaidError, Result};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// An integer grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    /// Row index.
    pub row: i32,
    /// Column index.
    pub col: i32,
}

impl GridCell {
    /// Create a new cell.
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Squared Euclidean distance between two cells, in cell units.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> i64 {
        let dr = i64::from(self.row - other.row);
        let dc = i64::from(self.col - other.col);
        dr * dr + dc * dc
    }

    /// Chebyshev distance (ring index) between two cells.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }
}

/// Isometric grid parameters.
///
/// Passed explicitly into every operation that converts between grid and
/// world space; there is no process-wide grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridParameters {
    /// World position of vertex (0, 0).
    pub p00: Vec2Fixed,
    /// Horizontal half-step of one cell.
    #[serde(with = "fixed_serde")]
    pub delta_x: Fixed,
    /// Vertical half-step of one cell.
    #[serde(with = "fixed_serde")]
    pub delta_y: Fixed,
    /// Number of cells per side; valid indices are `0..grid_size`.
    pub grid_size: u32,
}

impl GridParameters {
    /// Create grid parameters.
    ///
    /// # Panics
    ///
    /// Panics if either delta is not positive or `grid_size` is zero.
    #[must_use]
    pub fn new(p00: Vec2Fixed, delta_x: Fixed, delta_y: Fixed, grid_size: u32) -> Self {
        assert!(delta_x > Fixed::ZERO, "delta_x must be positive");
        assert!(delta_y > Fixed::ZERO, "delta_y must be positive");
        assert!(grid_size > 0, "grid_size must be positive");
        Self {
            p00,
            delta_x,
            delta_y,
            grid_size,
        }
    }

    /// Create grid parameters from untrusted input.
    ///
    /// # Errors
    /// Returns [`RaidError::InvalidGrid`] if either delta is not positive or
    /// `grid_size` is zero.
    pub fn try_new(p00: Vec2Fixed, delta_x: Fixed, delta_y: Fixed, grid_size: u32) -> Result<Self> {
        if delta_x <= Fixed::ZERO || delta_y <= Fixed::ZERO {
            return Err(RaidError::InvalidGrid(format!(
                "deltas must be positive, got ({delta_x}, {delta_y})"
            )));
        }
        if grid_size == 0 {
            return Err(RaidError::InvalidGrid("grid size must be positive".to_string()));
        }
        Ok(Self {
            p00,
            delta_x,
            delta_y,
            grid_size,
        })
    }

    /// True if the cell lies inside `[0, grid_size)` on both axes.
    #[must_use]
    pub fn in_bounds(&self, cell: GridCell) -> bool {
        let size = i64::from(self.grid_size);
        (0..size).contains(&i64::from(cell.row)) && (0..size).contains(&i64::from(cell.col))
    }

    /// World position of an integer cell.
    #[must_use]
    pub fn grid_to_world(&self, cell: GridCell) -> Vec2Fixed {
        self.grid_to_world_fractional(Fixed::from_num(cell.row), Fixed::from_num(cell.col))
    }

    /// World position of fractional grid coordinates (building anchors,
    /// footprint edges).
    #[must_use]
    pub fn grid_to_world_fractional(&self, row: Fixed, col: Fixed) -> Vec2Fixed {
        Vec2Fixed::new(
            self.p00.x + (row + col) * self.delta_x,
            self.p00.y + (col - row) * self.delta_y,
        )
    }

    /// Unrounded inverse transform. Never fails; the result may lie off-grid
    /// and saturates at the edges of the [`Fixed`] range.
    #[must_use]
    pub fn world_to_grid_fractional(&self, pos: Vec2Fixed) -> (Fixed, Fixed) {
        let u = pos.x.saturating_sub(self.p00.x).saturating_div(self.delta_x);
        let v = pos.y.saturating_sub(self.p00.y).saturating_div(self.delta_y);
        let col = u.saturating_add(v) / 2;
        let row = u.saturating_sub(v) / 2;
        (row, col)
    }

    /// Unrounded inverse transform, or `None` if any step overflows.
    #[must_use]
    pub fn checked_world_to_grid_fractional(&self, pos: Vec2Fixed) -> Option<(Fixed, Fixed)> {
        let u = pos.x.checked_sub(self.p00.x)?.checked_div(self.delta_x)?;
        let v = pos.y.checked_sub(self.p00.y)?.checked_div(self.delta_y)?;
        let col = u.checked_add(v)? / 2;
        let row = u.checked_sub(v)? / 2;
        Some((row, col))
    }

    /// Nearest integer cell to a world position, or `None` when that cell is
    /// outside the grid.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec2Fixed) -> Option<GridCell> {
        let (row, col) = self.checked_world_to_grid_fractional(pos)?;
        let cell = GridCell::new(round_to_i32(row)?, round_to_i32(col)?);
        self.in_bounds(cell).then_some(cell)
    }

    /// Snap a world position to the closest in-bounds grid vertex.
    ///
    /// Starts from the rounded inverse and checks the 3×3 neighbourhood
    /// around it, returning the candidate with the smallest world distance.
    /// Ties keep the first candidate in row-major order. Returns `None` when
    /// no candidate in the neighbourhood is in bounds.
    #[must_use]
    pub fn find_nearest_snap_vertex(&self, pos: Vec2Fixed) -> Option<(GridCell, Vec2Fixed)> {
        let (row, col) = self.checked_world_to_grid_fractional(pos)?;
        let center = GridCell::new(round_to_i32(row)?, round_to_i32(col)?);

        let mut best: Option<(GridCell, Vec2Fixed, Fixed)> = None;
        for dr in -1..=1 {
            for dc in -1..=1 {
                let cell = GridCell::new(center.row + dr, center.col + dc);
                if !self.in_bounds(cell) {
                    continue;
                }
                let world = self.grid_to_world(cell);
                let dist = world.distance_squared(pos);
                if best.map_or(true, |(_, _, d)| dist < d) {
                    best = Some((cell, world, dist));
                }
            }
        }

        best.map(|(cell, world, _)| (cell, world))
    }
}

/// Round half away from zero, rejecting values outside `i32`.
fn round_to_i32(value: Fixed) -> Option<i32> {
    value.round().checked_to_num::<i32>()
}
