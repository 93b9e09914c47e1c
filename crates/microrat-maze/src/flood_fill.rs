//! Flood-fill distance solver.
//!
//! A breadth-first search outward from the target writes each cell's step
//! count into the grid's distance layer. Walls that have not been seen are
//! assumed open, so the result is optimistic for unexplored parts of the maze.
//!
//! # Example
//!
//! ```rust
//! use microrat_maze::{compute_distances, Grid};
//! use microrat_types::Cell;
//!
//! let mut grid = Grid::new(7, 4).unwrap();
//! compute_distances(&mut grid, Cell::new(6, 3));
//!
//! assert_eq!(grid.distance_at(Cell::new(6, 3)), 0);
//! assert_eq!(grid.distance_at(Cell::new(0, 0)), 9);
//! ```

use microrat_types::{Cell, Orientation};
use tracing::{debug, warn};

use crate::grid::Grid;

// ────────────────────────────────────────────────────────────────────────────
// Work queue
// ────────────────────────────────────────────────────────────────────────────

/// Fixed-capacity FIFO ring buffer of cells.
///
/// Tracks its length explicitly so every slot is usable: a queue built with
/// capacity `n` holds exactly `n` cells.
#[derive(Debug)]
pub struct CellQueue {
    slots: Vec<Cell>,
    head: usize,
    len: usize,
}

impl CellQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Cell::default(); capacity],
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `cell`. Returns `false` and leaves the queue untouched when full.
    pub fn push(&mut self, cell: Cell) -> bool {
        if self.len == self.slots.len() {
            return false;
        }
        let tail = (self.head + self.len) % self.slots.len();
        self.slots[tail] = cell;
        self.len += 1;
        true
    }

    pub fn pop(&mut self) -> Option<Cell> {
        if self.len == 0 {
            return None;
        }
        let cell = self.slots[self.head];
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        Some(cell)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Solver
// ────────────────────────────────────────────────────────────────────────────

/// Recompute every cell's distance to `target` over the known walls.
///
/// Cells with no path keep [`UNREACHABLE`][microrat_types::UNREACHABLE]. An
/// invalid target leaves the whole grid unreachable. Calling this twice with
/// the same walls produces the same distances.
pub fn compute_distances(grid: &mut Grid, target: Cell) {
    grid.reset_distances();
    if !grid.is_valid(target) {
        warn!(%target, "flood-fill target outside the grid; all cells unreachable");
        return;
    }

    let mut queue = CellQueue::with_capacity(grid.len());
    grid.set_distance(target, 0);
    queue.push(target);

    let mut visited = 0usize;
    while let Some(cell) = queue.pop() {
        visited += 1;
        let next = grid.distance_at(cell).saturating_add(1);
        for heading in Orientation::ALL {
            let neighbor = cell.neighbor(heading);
            if !grid.is_valid(neighbor) || grid.wall_between(cell, neighbor) {
                continue;
            }
            if grid.distance_at(neighbor) > next {
                grid.set_distance(neighbor, next);
                if !queue.push(neighbor) {
                    warn!(%neighbor, capacity = queue.capacity(), "flood-fill queue full; cell dropped");
                }
            }
        }
    }
    debug!(%target, visited, "flood-fill complete");
}
