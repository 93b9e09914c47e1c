//! `microrat-maze` – the robot's model of the maze.
//!
//! # Modules
//!
//! - [`grid`] – [`Grid`][grid::Grid]: per-cell wall bitmasks plus the
//!   parallel distance grid.
//! - [`flood_fill`] – breadth-first distance computation from the target cell
//!   over a bounded ring-buffer queue.
//! - [`report`] – builds a [`MapReport`][microrat_types::MapReport] and draws
//!   it as ASCII art.

pub mod flood_fill;
pub mod grid;
pub mod report;

pub use flood_fill::compute_distances;
pub use grid::Grid;
pub use report::render_ascii;
