//! `microrat-types` – shared vocabulary for the MicroRat workspace.
//!
//! Every other crate speaks in these types: maze geometry ([`Cell`],
//! [`Orientation`], [`Pose`]), sensor snapshots ([`WallReading`]), the
//! operator-facing [`UserEvent`] stream and the workspace-wide [`RatError`].
//! Calibration constants live in [`config`].

pub mod config;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use config::{
    ControllerConfig, Hand, MazeConfig, MovementConfig, NavigationConfig, RatConfig,
};

/// Distance value of a cell that has no known path to the target.
pub const UNREACHABLE: u16 = 9999;

/// Largest grid, in cells, whose longest possible path stays below
/// [`UNREACHABLE`].
pub const MAX_CELLS: usize = UNREACHABLE as usize;

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// Absolute heading of the robot inside the maze. North is `+y`, East is `+x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    North,
    East,
    South,
    West,
}

impl Orientation {
    /// All headings in wall-bit order (N, E, S, W).
    pub const ALL: [Orientation; 4] = [
        Orientation::North,
        Orientation::East,
        Orientation::South,
        Orientation::West,
    ];

    /// Bit index of this side in a cell's wall mask.
    pub fn bit(self) -> u8 {
        match self {
            Orientation::North => 1,
            Orientation::East => 1 << 1,
            Orientation::South => 1 << 2,
            Orientation::West => 1 << 3,
        }
    }

    /// Heading after a quarter turn to the left.
    pub fn left(self) -> Self {
        match self {
            Orientation::North => Orientation::West,
            Orientation::East => Orientation::North,
            Orientation::South => Orientation::East,
            Orientation::West => Orientation::South,
        }
    }

    /// Heading after a quarter turn to the right.
    pub fn right(self) -> Self {
        match self {
            Orientation::North => Orientation::East,
            Orientation::East => Orientation::South,
            Orientation::South => Orientation::West,
            Orientation::West => Orientation::North,
        }
    }

    /// The opposite heading.
    pub fn opposite(self) -> Self {
        match self {
            Orientation::North => Orientation::South,
            Orientation::East => Orientation::West,
            Orientation::South => Orientation::North,
            Orientation::West => Orientation::East,
        }
    }

    /// Heading reached by executing `turn` while facing `self`.
    pub fn rotate(self, turn: TurnDirection) -> Self {
        match turn {
            TurnDirection::None => self,
            TurnDirection::Left => self.left(),
            TurnDirection::Right => self.right(),
            TurnDirection::Around => self.opposite(),
        }
    }

    /// Grid offset `(dx, dy)` of one step in this heading.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Orientation::North => (0, 1),
            Orientation::East => (1, 0),
            Orientation::South => (0, -1),
            Orientation::West => (-1, 0),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::North => "N",
            Orientation::East => "E",
            Orientation::South => "S",
            Orientation::West => "W",
        };
        write!(f, "{name}")
    }
}

/// Relative turn executed before a forward move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnDirection {
    None,
    Left,
    Right,
    Around,
}

impl TurnDirection {
    /// The turn that rotates a robot facing `from` so it faces `to`.
    pub fn between(from: Orientation, to: Orientation) -> Self {
        if from == to {
            TurnDirection::None
        } else if from.left() == to {
            TurnDirection::Left
        } else if from.right() == to {
            TurnDirection::Right
        } else {
            TurnDirection::Around
        }
    }
}

/// A maze cell coordinate. Signed so off-grid neighbours stay representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell one step toward `heading`. May lie off the grid.
    pub fn neighbor(self, heading: Orientation) -> Self {
        let (dx, dy) = heading.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Absolute direction from `self` to `other` when the two are 4-adjacent.
    pub fn direction_to(self, other: Cell) -> Option<Orientation> {
        Orientation::ALL
            .into_iter()
            .find(|&heading| self.neighbor(heading) == other)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Where the robot is and which way it faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pose {
    pub cell: Cell,
    pub orientation: Orientation,
}

impl Pose {
    pub const fn new(cell: Cell, orientation: Orientation) -> Self {
        Self { cell, orientation }
    }

    /// Pose after turning in place.
    pub fn turned(self, turn: TurnDirection) -> Self {
        Self::new(self.cell, self.orientation.rotate(turn))
    }

    /// Pose after driving one cell forward.
    pub fn advanced(self) -> Self {
        Self::new(self.cell.neighbor(self.orientation), self.orientation)
    }

    /// Absolute heading of the side that is `turn` relative to the robot.
    pub fn side(self, turn: TurnDirection) -> Orientation {
        self.orientation.rotate(turn)
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} facing {}", self.cell, self.orientation)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sensing
// ────────────────────────────────────────────────────────────────────────────

/// Wall presence on the three sensed sides, sampled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WallReading {
    pub front: bool,
    pub left: bool,
    pub right: bool,
}

impl WallReading {
    pub const fn new(front: bool, left: bool, right: bool) -> Self {
        Self { front, left, right }
    }

    /// `true` when no side reports a wall.
    pub fn is_open(&self) -> bool {
        !(self.front || self.left || self.right)
    }
}

/// Outcome of the optional start-up self test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub passed: bool,
    pub details: String,
}

impl DiagnosticReport {
    pub fn passed(details: impl Into<String>) -> Self {
        Self {
            passed: true,
            details: details.into(),
        }
    }

    pub fn failed(details: impl Into<String>) -> Self {
        Self {
            passed: false,
            details: details.into(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Map report
// ────────────────────────────────────────────────────────────────────────────

/// First line of a printed [`MapReport`]. The serial map visualiser starts
/// reading a map when it sees this line.
pub const MAP_REPORT_HEADER: &str = "Labyrinth Karte:";

/// One cell of a [`MapReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellReport {
    pub x: i32,
    pub y: i32,
    /// Wall bitmask, bit 0 = N, 1 = E, 2 = S, 3 = W.
    pub walls: u8,
    pub distance: u16,
}

/// Snapshot of the wall map and distance grid, top row (`y = height - 1`)
/// first.
///
/// `Display` renders the line-oriented report sent to the operator:
///
/// ```text
/// Labyrinth Karte:
/// [1][0]:9:1,[1][1]:3:0,
/// [0][0]:12:2,[0][1]:6:1,
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapReport {
    pub width: usize,
    pub height: usize,
    pub rows: Vec<Vec<CellReport>>,
}

impl MapReport {
    /// Look up the reported cell at `(x, y)`.
    pub fn cell(&self, x: i32, y: i32) -> Option<&CellReport> {
        self.rows
            .iter()
            .flatten()
            .find(|c| c.x == x && c.y == y)
    }
}

impl fmt::Display for MapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{MAP_REPORT_HEADER}")?;
        for row in &self.rows {
            for c in row {
                write!(f, "[{}][{}]:{}:{},", c.y, c.x, c.walls, c.distance)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Operator feedback
// ────────────────────────────────────────────────────────────────────────────

/// Notifications the robot sends to its operator (LEDs, buzzer, debug link).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum UserEvent {
    /// Exploration arrived at the target cell.
    TargetReached,
    /// Flood-fill finished; carries the map that was computed.
    MapReport(MapReport),
    /// Shortest path is ready; the robot should be carried back to the start.
    OptimisationComplete,
    DiagnosticsResult { passed: bool, report: String },
    /// Exploration lost contact with the maze walls.
    OutOfBounds,
    /// The shortest-path run arrived at the target.
    RunComplete,
    RunFailed { reason: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Workspace-wide error type.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RatError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Motion Stall: {reason}")]
    Stall { reason: String },

    #[error("Out of Bounds at {cell}")]
    OutOfBounds { cell: Cell },

    #[error("Diagnostics Failed: {report}")]
    DiagnosticsFailed { report: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl RatError {
    /// Shorthand for a [`RatError::HardwareFault`].
    pub fn hardware(component: impl Into<String>, details: impl Into<String>) -> Self {
        RatError::HardwareFault {
            component: component.into(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_then_right_is_identity() {
        for heading in Orientation::ALL {
            assert_eq!(heading.left().right(), heading);
            assert_eq!(heading.right().left(), heading);
            assert_eq!(heading.opposite().opposite(), heading);
        }
    }

    #[test]
    fn four_left_turns_return_to_start() {
        let mut heading = Orientation::East;
        for _ in 0..4 {
            heading = heading.rotate(TurnDirection::Left);
        }
        assert_eq!(heading, Orientation::East);
    }

    #[test]
    fn turn_between_resolves_all_cases() {
        let from = Orientation::North;
        assert_eq!(TurnDirection::between(from, Orientation::North), TurnDirection::None);
        assert_eq!(TurnDirection::between(from, Orientation::West), TurnDirection::Left);
        assert_eq!(TurnDirection::between(from, Orientation::East), TurnDirection::Right);
        assert_eq!(TurnDirection::between(from, Orientation::South), TurnDirection::Around);
    }

    #[test]
    fn turn_between_agrees_with_rotate() {
        for from in Orientation::ALL {
            for to in Orientation::ALL {
                assert_eq!(from.rotate(TurnDirection::between(from, to)), to);
            }
        }
    }

    #[test]
    fn wall_bits_are_distinct() {
        let mask = Orientation::ALL.iter().fold(0u8, |acc, o| acc | o.bit());
        assert_eq!(mask, 0b1111);
    }

    #[test]
    fn cell_neighbor_and_direction() {
        let c = Cell::new(2, 2);
        assert_eq!(c.neighbor(Orientation::North), Cell::new(2, 3));
        assert_eq!(c.neighbor(Orientation::West), Cell::new(1, 2));
        assert_eq!(c.direction_to(Cell::new(3, 2)), Some(Orientation::East));
        assert_eq!(c.direction_to(Cell::new(3, 3)), None);
        assert_eq!(c.direction_to(c), None);
    }

    #[test]
    fn pose_side_maps_relative_to_absolute() {
        let pose = Pose::new(Cell::new(0, 0), Orientation::East);
        assert_eq!(pose.side(TurnDirection::None), Orientation::East);
        assert_eq!(pose.side(TurnDirection::Left), Orientation::North);
        assert_eq!(pose.side(TurnDirection::Right), Orientation::South);
        assert_eq!(pose.advanced().cell, Cell::new(1, 0));
    }

    #[test]
    fn map_report_line_format() {
        let report = MapReport {
            width: 2,
            height: 1,
            rows: vec![vec![
                CellReport { x: 0, y: 0, walls: 13, distance: 1 },
                CellReport { x: 1, y: 0, walls: 7, distance: 0 },
            ]],
        };
        let text = report.to_string();
        assert!(text.starts_with("Labyrinth Karte:\n"));
        assert!(text.contains("[0][0]:13:1,[0][1]:7:0,"));
        assert_eq!(report.cell(1, 0).map(|c| c.distance), Some(0));
    }

    #[test]
    fn user_event_serializes_with_tag() {
        let event = UserEvent::RunFailed {
            reason: "stalled".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"RunFailed\""));
        let back: UserEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn rat_error_display() {
        let err = RatError::hardware("left_motor", "driver offline");
        assert!(err.to_string().contains("left_motor"));

        let err = RatError::OutOfBounds { cell: Cell::new(7, 0) };
        assert!(err.to_string().contains("(7, 0)"));
    }
}
