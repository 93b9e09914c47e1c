//! Shortest-path step selection over a solved distance grid.

use microrat_maze::Grid;
use microrat_types::{Cell, Orientation, Pose, TurnDirection};

/// The next step of a shortest-path run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortestPathMove {
    pub cell: Cell,
    pub orientation: Orientation,
    pub turn: TurnDirection,
}

impl ShortestPathMove {
    /// Pose the robot holds after the step.
    pub fn pose(&self) -> Pose {
        Pose::new(self.cell, self.orientation)
    }

    /// `false` for the "no progress" result of [`next_move`].
    pub fn makes_progress(&self, from: Pose) -> bool {
        self.cell != from.cell
    }
}

/// Pick the neighbour to drive to next.
///
/// Straight ahead is preferred, then left, then right. A candidate must be
/// inside the grid, not wall-separated from the current cell and strictly
/// closer to the target. When nothing qualifies the current pose is returned
/// with [`TurnDirection::None`].
///
/// ```rust
/// use microrat_maze::{compute_distances, Grid};
/// use microrat_nav::move_selector::next_move;
/// use microrat_types::{Cell, Orientation, Pose, TurnDirection};
///
/// let mut grid = Grid::new(2, 2).unwrap();
/// compute_distances(&mut grid, Cell::new(1, 1));
///
/// // Facing East at the origin: straight ahead is one step closer.
/// let step = next_move(Pose::new(Cell::new(0, 0), Orientation::East), &grid);
/// assert_eq!(step.cell, Cell::new(1, 0));
/// assert_eq!(step.turn, TurnDirection::None);
/// ```
pub fn next_move(pose: Pose, grid: &Grid) -> ShortestPathMove {
    let here = grid.distance_at(pose.cell);
    for turn in [TurnDirection::None, TurnDirection::Left, TurnDirection::Right] {
        let heading = pose.side(turn);
        let candidate = pose.cell.neighbor(heading);
        if !grid.is_valid(candidate) || grid.wall_between(pose.cell, candidate) {
            continue;
        }
        if grid.distance_at(candidate) < here {
            return ShortestPathMove {
                cell: candidate,
                orientation: heading,
                turn,
            };
        }
    }
    ShortestPathMove {
        cell: pose.cell,
        orientation: pose.orientation,
        turn: TurnDirection::None,
    }
}

/// Turn around toward the cell behind when it is the only way down.
///
/// [`next_move`] never reverses. That is only needed after the robot drove
/// into a dead end the map had not seen, and new walls closed the route
/// ahead.
pub fn retreat(pose: Pose, grid: &Grid) -> Option<ShortestPathMove> {
    let heading = pose.orientation.opposite();
    let candidate = pose.cell.neighbor(heading);
    let open = grid.is_valid(candidate) && !grid.wall_between(pose.cell, candidate);
    (open && grid.distance_at(candidate) < grid.distance_at(pose.cell)).then_some(ShortestPathMove {
        cell: candidate,
        orientation: heading,
        turn: TurnDirection::Around,
    })
}

/// Turn that takes a robot facing `from` to face `to`.
pub fn turn_between(from: Orientation, to: Orientation) -> TurnDirection {
    TurnDirection::between(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use microrat_maze::compute_distances;

    fn open_grid() -> Grid {
        let mut grid = Grid::new(7, 4).unwrap();
        compute_distances(&mut grid, Cell::new(6, 3));
        grid
    }

    #[test]
    fn prefers_straight_when_it_descends() {
        let grid = open_grid();
        let step = next_move(Pose::new(Cell::new(0, 0), Orientation::East), &grid);
        assert_eq!(step.pose(), Pose::new(Cell::new(1, 0), Orientation::East));
        assert_eq!(step.turn, TurnDirection::None);
    }

    #[test]
    fn left_beats_right() {
        let grid = open_grid();
        // Facing South at (3,2): ahead is farther, left (East) and right
        // (West) neighbours; only East is closer.
        let step = next_move(Pose::new(Cell::new(3, 2), Orientation::South), &grid);
        assert_eq!(step.turn, TurnDirection::Left);
        assert_eq!(step.cell, Cell::new(4, 2));
        assert_eq!(step.orientation, Orientation::East);
    }

    #[test]
    fn turns_right_when_only_right_descends() {
        let grid = open_grid();
        // Facing West at (3,2): ahead and left move away, right (North) descends.
        let step = next_move(Pose::new(Cell::new(3, 2), Orientation::West), &grid);
        assert_eq!(step.turn, TurnDirection::Right);
        assert_eq!(step.cell, Cell::new(3, 3));
    }

    #[test]
    fn walls_are_respected() {
        let mut grid = Grid::new(7, 4).unwrap();
        grid.set_wall(Cell::new(0, 0), Orientation::East);
        compute_distances(&mut grid, Cell::new(6, 3));
        let step = next_move(Pose::new(Cell::new(0, 0), Orientation::East), &grid);
        assert_eq!(step.turn, TurnDirection::Left);
        assert_eq!(step.cell, Cell::new(0, 1));
    }

    #[test]
    fn no_descent_returns_current_pose() {
        let grid = open_grid();
        let pose = Pose::new(Cell::new(0, 0), Orientation::West);
        // Behind the robot is the only way down; the selector never reverses.
        let blocked = {
            let mut g = Grid::new(7, 4).unwrap();
            g.set_wall(Cell::new(0, 0), Orientation::North);
            compute_distances(&mut g, Cell::new(6, 3));
            g
        };
        let step = next_move(pose, &blocked);
        assert_eq!(step.pose(), pose);
        assert_eq!(step.turn, TurnDirection::None);
        assert!(!step.makes_progress(pose));

        // At the target nothing is strictly closer either.
        let at_target = Pose::new(Cell::new(6, 3), Orientation::North);
        assert!(!next_move(at_target, &grid).makes_progress(at_target));
    }

    #[test]
    fn retreat_backs_out_of_a_dead_end() {
        // (1,1) is closed on three sides; the way on is back South.
        let mut grid = Grid::new(3, 3).unwrap();
        let pocket = Cell::new(1, 1);
        for heading in [Orientation::North, Orientation::East, Orientation::West] {
            grid.set_wall(pocket, heading);
        }
        compute_distances(&mut grid, Cell::new(2, 2));
        let pose = Pose::new(pocket, Orientation::North);
        assert!(!next_move(pose, &grid).makes_progress(pose));

        let step = retreat(pose, &grid).unwrap();
        assert_eq!(step.pose(), Pose::new(Cell::new(1, 0), Orientation::South));
        assert_eq!(step.turn, TurnDirection::Around);
    }

    #[test]
    fn retreat_needs_an_open_descent_behind() {
        let grid = open_grid();
        // Behind (0,0) facing East is outside the grid.
        assert_eq!(retreat(Pose::new(Cell::new(0, 0), Orientation::East), &grid), None);
        // Behind (3,2) facing East is (2,2), which is farther away.
        assert_eq!(retreat(Pose::new(Cell::new(3, 2), Orientation::East), &grid), None);
    }

    #[test]
    fn selected_neighbour_is_always_closer() {
        let grid = open_grid();
        for cell in grid.cells() {
            for orientation in Orientation::ALL {
                let pose = Pose::new(cell, orientation);
                let step = next_move(pose, &grid);
                if step.makes_progress(pose) {
                    assert!(grid.distance_at(step.cell) < grid.distance_at(cell));
                    assert_eq!(turn_between(orientation, step.orientation), step.turn);
                }
            }
        }
    }
}
