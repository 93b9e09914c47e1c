//! Maze layouts for the simulator.
//!
//! A layout is ASCII art of `2·height + 1` lines, top row first. Even lines
//! hold `+` posts with `-` for horizontal walls; odd lines hold `|` for
//! vertical walls with the cell interiors between them. Any non-space
//! character in a wall slot counts as a wall, and short lines are padded with
//! spaces.
//!
//! # Example
//!
//! ```rust
//! use microrat_hal::sim_maze::SimMaze;
//! use microrat_types::{Cell, Orientation};
//!
//! let maze = SimMaze::parse("+-+-+\n|   |\n+-+-+").unwrap();
//! assert_eq!((maze.width(), maze.height()), (2, 1));
//! assert!(!maze.has_wall(Cell::new(0, 0), Orientation::East));
//! assert!(maze.has_wall(Cell::new(0, 0), Orientation::West));
//! ```

use microrat_types::{Cell, Orientation, RatError};

/// The 7×4 maze the simulated runs default to. Start (0,0) facing East,
/// goal (6,3) in the top-right corner.
pub const DEFAULT_LAYOUT: &str = "\
+-+-+-+-+-+-+-+
|             |
+ +-+-+-+-+-+-+
|             |
+ +-+-+-+ +-+-+
| | |         |
+-+ +-+-+-+-+ +
|             |
+-+-+-+-+-+-+-+";

/// Ground-truth walls of a simulated maze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimMaze {
    width: usize,
    height: usize,
    walls: Vec<u8>,
}

impl SimMaze {
    /// The built-in [`DEFAULT_LAYOUT`].
    ///
    /// # Errors
    ///
    /// Never fails for the built-in layout; the `Result` mirrors [`parse`][Self::parse].
    pub fn default_layout() -> Result<Self, RatError> {
        Self::parse(DEFAULT_LAYOUT)
    }

    /// Parse an ASCII layout.
    ///
    /// # Errors
    ///
    /// Returns [`RatError::Config`] if the layout has an even number of
    /// lines, fewer than three lines, or is narrower than one cell.
    pub fn parse(layout: &str) -> Result<Self, RatError> {
        let lines: Vec<Vec<char>> = layout
            .lines()
            .map(|l| l.trim_end().chars().collect::<Vec<char>>())
            .skip_while(|l| l.is_empty())
            .collect();
        let lines: Vec<Vec<char>> = {
            let end = lines.iter().rposition(|l| !l.is_empty()).map_or(0, |i| i + 1);
            lines.into_iter().take(end).collect()
        };

        if lines.len() < 3 || lines.len() % 2 == 0 {
            return Err(RatError::Config(format!(
                "maze layout needs an odd number of lines (at least 3), got {}",
                lines.len()
            )));
        }
        let columns = lines.iter().map(Vec::len).max().unwrap_or(0);
        if columns < 3 {
            return Err(RatError::Config("maze layout is narrower than one cell".into()));
        }

        let height = (lines.len() - 1) / 2;
        let width = (columns - 1) / 2;
        let slot = |line: usize, col: usize| -> bool {
            lines
                .get(line)
                .and_then(|l| l.get(col))
                .is_some_and(|c| !c.is_whitespace())
        };

        let mut walls = vec![0u8; width * height];
        for row in 0..height {
            let y = height - 1 - row;
            for x in 0..width {
                let mut mask = 0u8;
                if slot(2 * row, 2 * x + 1) {
                    mask |= Orientation::North.bit();
                }
                if slot(2 * row + 2, 2 * x + 1) {
                    mask |= Orientation::South.bit();
                }
                if slot(2 * row + 1, 2 * x) {
                    mask |= Orientation::West.bit();
                }
                if slot(2 * row + 1, 2 * x + 2) {
                    mask |= Orientation::East.bit();
                }
                walls[y * width + x] = mask;
            }
        }
        Ok(Self { width, height, walls })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    /// `true` if `cell` is closed on its `heading` side. The maze edge is
    /// always closed, drawn or not.
    pub fn has_wall(&self, cell: Cell, heading: Orientation) -> bool {
        if !self.contains(cell) || !self.contains(cell.neighbor(heading)) {
            return true;
        }
        let mask = self.walls[cell.y as usize * self.width + cell.x as usize];
        mask & heading.bit() != 0
    }

    /// Number of open cells in a straight line from `cell` toward `heading`
    /// before the first wall.
    pub fn open_run(&self, cell: Cell, heading: Orientation) -> usize {
        let mut run = 0;
        let mut current = cell;
        while !self.has_wall(current, heading) {
            current = current.neighbor(heading);
            run += 1;
        }
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_seven_by_four() {
        let maze = SimMaze::default_layout().unwrap();
        assert_eq!((maze.width(), maze.height()), (7, 4));
    }

    #[test]
    fn default_layout_walls() {
        let maze = SimMaze::default_layout().unwrap();
        // Bottom corridor is open all the way along.
        assert_eq!(maze.open_run(Cell::new(0, 0), Orientation::East), 6);
        // Dead end above (1,0).
        let pocket = Cell::new(1, 1);
        assert!(!maze.has_wall(pocket, Orientation::South));
        assert!(maze.has_wall(pocket, Orientation::North));
        assert!(maze.has_wall(pocket, Orientation::East));
        assert!(maze.has_wall(pocket, Orientation::West));
        // Only way into the top row is up the left edge.
        assert!(!maze.has_wall(Cell::new(0, 2), Orientation::North));
        assert!(maze.has_wall(Cell::new(4, 2), Orientation::North));
    }

    #[test]
    fn edge_is_always_closed() {
        let maze = SimMaze::parse("+ +\n   \n+ +").unwrap();
        assert!(maze.has_wall(Cell::new(0, 0), Orientation::North));
        assert!(maze.has_wall(Cell::new(0, 0), Orientation::West));
        assert_eq!(maze.open_run(Cell::new(0, 0), Orientation::South), 0);
    }

    #[test]
    fn walls_are_shared_by_both_cells() {
        let maze = SimMaze::parse("+-+-+\n| | |\n+-+-+").unwrap();
        assert!(maze.has_wall(Cell::new(0, 0), Orientation::East));
        assert!(maze.has_wall(Cell::new(1, 0), Orientation::West));
    }

    #[test]
    fn surrounding_blank_lines_are_ignored() {
        let maze = SimMaze::parse("\n\n+-+\n| |\n+-+\n\n").unwrap();
        assert_eq!((maze.width(), maze.height()), (1, 1));
    }

    #[test]
    fn even_line_count_is_rejected() {
        assert!(matches!(SimMaze::parse("+-+\n| |"), Err(RatError::Config(_))));
        assert!(matches!(SimMaze::parse(""), Err(RatError::Config(_))));
    }
}
