//! `microrat-nav` – the robot's decision making.
//!
//! Sequences a run: wall-following exploration until the target is found,
//! flood-fill and report, then a shortest-path run from the start cell.
//!
//! # Modules
//!
//! - [`wall_follower`] – one-sided wall-following rule.
//! - [`move_selector`] – straight-preferred downhill step over the distance
//!   grid.
//! - [`watchdog`] – [`BoundsWatchdog`][watchdog::BoundsWatchdog]: detects an
//!   explorer that has lost contact with the maze walls.
//! - [`context`] – [`RobotContext`][context::RobotContext]: pose, map and
//!   goal owned by the state machine.
//! - [`state_machine`] – [`Navigator`][state_machine::Navigator]: the
//!   `Idle → Explore → WaitReport → ShortestPath` state machine.
//! - [`telemetry`] – `tracing` subscriber initialisation.

pub mod context;
pub mod move_selector;
pub mod state_machine;
pub mod telemetry;
pub mod wall_follower;
pub mod watchdog;

pub use context::RobotContext;
pub use state_machine::{NavState, Navigator};
