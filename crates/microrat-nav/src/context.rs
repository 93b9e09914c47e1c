//! [`RobotContext`] – everything the navigator knows about the run.

use microrat_maze::Grid;
use microrat_types::{Cell, Hand, Pose, RatConfig, RatError};

use crate::watchdog::BoundsWatchdog;

/// Pose, wall map and goal of one robot, owned by the
/// [`Navigator`][crate::Navigator] and lent to the decision components.
///
/// The pose is updated only after a move has physically completed.
#[derive(Debug, Clone)]
pub struct RobotContext {
    pub pose: Pose,
    pub grid: Grid,
    pub target: Cell,
    pub origin: Pose,
    pub hand: Hand,
    pub watchdog: BoundsWatchdog,
}

impl RobotContext {
    /// Build a context from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RatError::Config`] for an invalid configuration.
    pub fn from_config(config: &RatConfig) -> Result<Self, RatError> {
        config.validate()?;
        let origin = Pose::new(config.maze.origin, config.maze.start_orientation);
        Ok(Self {
            pose: origin,
            grid: Grid::new(config.maze.width, config.maze.height)?,
            target: config.maze.target,
            origin,
            hand: config.navigation.hand,
            watchdog: BoundsWatchdog::new(config.navigation.out_of_bounds_threshold),
        })
    }

    /// Forget the previous run: back to the origin with an empty map.
    pub fn reset_for_run(&mut self) {
        self.pose = self.origin;
        self.grid.reset();
        self.watchdog.reset();
    }

    /// Put the robot back at the origin, keeping the map.
    pub fn return_to_origin(&mut self) {
        self.pose = self.origin;
    }

    pub fn at_target(&self) -> bool {
        self.pose.cell == self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use microrat_types::{Orientation, WallReading, UNREACHABLE};

    #[test]
    fn starts_at_configured_origin() {
        let ctx = RobotContext::from_config(&RatConfig::default()).unwrap();
        assert_eq!(ctx.pose, Pose::new(Cell::new(0, 0), Orientation::East));
        assert_eq!(ctx.target, Cell::new(6, 3));
        assert_eq!((ctx.grid.width(), ctx.grid.height()), (7, 4));
        assert!(!ctx.at_target());
    }

    #[test]
    fn reset_clears_map_and_pose() {
        let mut ctx = RobotContext::from_config(&RatConfig::default()).unwrap();
        ctx.grid.record_walls(ctx.pose, WallReading::new(true, true, true));
        ctx.grid.set_distance(Cell::new(0, 0), 3);
        ctx.pose = Pose::new(Cell::new(6, 3), Orientation::North);
        assert!(ctx.at_target());

        ctx.reset_for_run();
        assert_eq!(ctx.pose, ctx.origin);
        assert_eq!(ctx.grid.walls_at(Cell::new(0, 0)), 0);
        assert_eq!(ctx.grid.distance_at(Cell::new(0, 0)), UNREACHABLE);
    }

    #[test]
    fn rejects_invalid_configuration() {
        let mut config = RatConfig::default();
        config.maze.target = Cell::new(9, 9);
        assert!(matches!(
            RobotContext::from_config(&config),
            Err(RatError::Config(_))
        ));
    }
}
