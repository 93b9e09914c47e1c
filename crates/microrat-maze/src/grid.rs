//! Wall map and distance grid.
//!
//! Walls are stored per cell as a 4-bit mask indexed by absolute direction
//! (see [`Orientation::bit`]). A wall between two cells is present when
//! *either* cell has its bit toward the other set, so a wall only ever needs
//! to be recorded from one side.
//!
//! # Example
//!
//! ```rust
//! use microrat_maze::grid::Grid;
//! use microrat_types::{Cell, Orientation, Pose, WallReading};
//!
//! let mut grid = Grid::new(7, 4).unwrap();
//! let pose = Pose::new(Cell::new(0, 0), Orientation::East);
//!
//! // Facing East: front → E, left → N, right → S.
//! grid.record_walls(pose, WallReading::new(false, true, true));
//! assert!(grid.wall_between(Cell::new(0, 0), Cell::new(0, 1)));
//! assert!(!grid.wall_between(Cell::new(0, 0), Cell::new(1, 0)));
//! ```

use microrat_types::{
    Cell, MAX_CELLS, MapReport, Orientation, Pose, RatError, TurnDirection, UNREACHABLE, WallReading,
};

use crate::report;

/// All four wall bits set; returned for cells outside the grid.
pub const ALL_WALLS: u8 = 0b1111;

/// Fixed-size wall map with a parallel distance grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    walls: Vec<u8>,
    distance: Vec<u16>,
}

impl Grid {
    /// Create an empty grid: no walls known, every distance unreachable.
    ///
    /// # Errors
    ///
    /// Returns [`RatError::Config`] if either dimension is zero, or if the
    /// grid has more than [`MAX_CELLS`] cells and a real distance could
    /// collide with [`UNREACHABLE`].
    pub fn new(width: usize, height: usize) -> Result<Self, RatError> {
        if width == 0 || height == 0 {
            return Err(RatError::Config(format!(
                "grid dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let cells = width.saturating_mul(height);
        if cells > MAX_CELLS {
            return Err(RatError::Config(format!(
                "grid of {width}x{height} cells exceeds the {MAX_CELLS}-cell limit"
            )));
        }
        Ok(Self {
            width,
            height,
            walls: vec![0; cells],
            distance: vec![UNREACHABLE; cells],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells in the grid.
    pub fn len(&self) -> usize {
        self.walls.len()
    }

    /// A grid always holds at least one cell.
    pub fn is_empty(&self) -> bool {
        self.walls.is_empty()
    }

    /// Forget all walls and distances. Called at the start of every run.
    pub fn reset(&mut self) {
        self.walls.fill(0);
        self.reset_distances();
    }

    /// Set every distance to [`UNREACHABLE`].
    pub fn reset_distances(&mut self) {
        self.distance.fill(UNREACHABLE);
    }

    /// Pure bounds check.
    pub fn is_valid(&self, cell: Cell) -> bool {
        self.index(cell).is_some()
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }
        let (x, y) = (cell.x as usize, cell.y as usize);
        (x < self.width && y < self.height).then_some(y * self.width + x)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Walls
    // ────────────────────────────────────────────────────────────────────────

    /// Record the walls seen from `pose`. Bits are only ever set, never
    /// cleared. Readings from outside the grid are ignored.
    ///
    /// Returns `true` if the cell gained a wall bit it did not have.
    pub fn record_walls(&mut self, pose: Pose, reading: WallReading) -> bool {
        let before = self.walls_at(pose.cell);
        let sides = [
            (reading.front, TurnDirection::None),
            (reading.left, TurnDirection::Left),
            (reading.right, TurnDirection::Right),
        ];
        for (present, side) in sides {
            if present {
                self.set_wall(pose.cell, pose.side(side));
            }
        }
        self.walls_at(pose.cell) != before
    }

    /// Mark a wall on the `heading` side of `cell`.
    pub fn set_wall(&mut self, cell: Cell, heading: Orientation) {
        if let Some(i) = self.index(cell) {
            self.walls[i] |= heading.bit();
        }
    }

    /// Wall bitmask of `cell`; [`ALL_WALLS`] outside the grid.
    pub fn walls_at(&self, cell: Cell) -> u8 {
        self.index(cell).map_or(ALL_WALLS, |i| self.walls[i])
    }

    /// `true` if a wall separates `a` from `b`.
    ///
    /// Invalid cells, non-adjacent pairs and `a == b` all count as walled.
    pub fn wall_between(&self, a: Cell, b: Cell) -> bool {
        if !self.is_valid(a) || !self.is_valid(b) {
            return true;
        }
        let Some(heading) = a.direction_to(b) else {
            return true;
        };
        self.walls_at(a) & heading.bit() != 0
            || self.walls_at(b) & heading.opposite().bit() != 0
    }

    // ────────────────────────────────────────────────────────────────────────
    // Distances
    // ────────────────────────────────────────────────────────────────────────

    /// Distance of `cell` to the target; [`UNREACHABLE`] outside the grid.
    pub fn distance_at(&self, cell: Cell) -> u16 {
        self.index(cell).map_or(UNREACHABLE, |i| self.distance[i])
    }

    /// Write a distance. Writes to invalid cells are dropped.
    pub fn set_distance(&mut self, cell: Cell, distance: u16) {
        if let Some(i) = self.index(cell) {
            self.distance[i] = distance;
        }
    }

    /// Iterate over every cell, row by row from `y = 0`.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).map(move |x| Cell::new(x as i32, y as i32))
        })
    }

    /// Snapshot of walls and distances, top row first.
    pub fn report(&self) -> MapReport {
        report::build(self)
    }
}
