//! Calibration and run configuration.
//!
//! Every section deserializes with per-field serde defaults so a partial TOML
//! file only overrides what it names. The defaults are the calibrated values
//! of the reference robot (88 mm wheel base, 170 mm cells, 3300 PWM counts).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{Cell, MAX_CELLS, Orientation, RatError};

/// Which wall the explorer keeps contact with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    #[default]
    Left,
    Right,
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hand::Left => write!(f, "left"),
            Hand::Right => write!(f, "right"),
        }
    }
}

impl FromStr for Hand {
    type Err = RatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Hand::Left),
            "right" => Ok(Hand::Right),
            other => Err(RatError::Config(format!("unknown hand '{other}'"))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

/// Maze geometry and the fixed start/goal cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MazeConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    #[serde(default)]
    pub origin: Cell,
    #[serde(default = "default_start_orientation")]
    pub start_orientation: Orientation,
    #[serde(default = "default_target")]
    pub target: Cell,
}

/// Wheel controller gains and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Control tick period in milliseconds.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
    #[serde(default = "default_pwm_max")]
    pub pwm_max: i32,
    #[serde(default = "default_kp_straight")]
    pub kp_straight: f32,
    #[serde(default = "default_kd_straight")]
    pub kd_straight: f32,
    #[serde(default = "default_kp_turn")]
    pub kp_turn: f32,
    /// Gain on the left/right travel difference.
    #[serde(default = "default_k_sync")]
    pub k_sync: f32,
    #[serde(default = "default_tolerance_mm")]
    pub tolerance_mm: f32,
    /// Consecutive in-tolerance ticks before a goal counts as reached.
    #[serde(default = "default_settle_ticks")]
    pub settle_ticks: u32,
    #[serde(default = "default_overshoot_bound_mm")]
    pub overshoot_bound_mm: f32,
    #[serde(default = "default_overshoot_ticks")]
    pub overshoot_ticks: u32,
    /// Consecutive ticks a strongly driven wheel may report no travel.
    #[serde(default = "default_stall_ticks")]
    pub stall_ticks: u32,
    /// Commands below this magnitude never count toward a stall.
    #[serde(default = "default_stall_min_pwm")]
    pub stall_min_pwm: i32,
}

/// Geometry and timing of the motion primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    #[serde(default = "default_wheel_base_mm")]
    pub wheel_base_mm: f32,
    /// Multiplier on the quarter-turn arc for a 180° turn.
    #[serde(default = "default_around_factor")]
    pub around_factor: f32,
    #[serde(default = "default_cell_reference_mm")]
    pub cell_reference_mm: f32,
    /// Allowed fractional deviation of an estimated cell length.
    #[serde(default = "default_cell_tolerance")]
    pub cell_tolerance: f32,
    #[serde(default = "default_cell_quantum_mm")]
    pub cell_quantum_mm: f32,
    #[serde(default = "default_min_wall_distance_mm")]
    pub min_wall_distance_mm: f32,
    #[serde(default = "default_max_measurement_mm")]
    pub max_measurement_mm: f32,
    /// Pause after every primitive so the chassis comes to rest.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_recalibrate_reverse_pwm")]
    pub recalibrate_reverse_pwm: i32,
    #[serde(default = "default_recalibrate_reverse_ms")]
    pub recalibrate_reverse_ms: u64,
    /// Distance from the robot's centre to its rear bumper. Recalibration
    /// backs the bumper into the wall, then drives this much less than half
    /// a cell to come back to the cell centre.
    #[serde(default = "default_bumper_offset_mm")]
    pub bumper_offset_mm: f32,
    /// Straight gain used for the nudge off the back wall.
    #[serde(default = "default_recalibrate_kp")]
    pub recalibrate_kp: f32,
    /// Longest a single primitive may run before it is abandoned as stalled.
    #[serde(default = "default_primitive_timeout_ms")]
    pub primitive_timeout_ms: u64,
}

/// Exploration and run sequencing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default)]
    pub hand: Hand,
    /// Wall-less exploration steps tolerated before giving up.
    #[serde(default = "default_out_of_bounds_threshold")]
    pub out_of_bounds_threshold: u32,
    /// Pause between the start trigger and the first move.
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
    #[serde(default = "default_run_diagnostics")]
    pub run_diagnostics: bool,
}

/// Complete robot configuration, one TOML table per section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RatConfig {
    #[serde(default)]
    pub maze: MazeConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

// ────────────────────────────────────────────────────────────────────────────
// Defaults
// ────────────────────────────────────────────────────────────────────────────

fn default_width() -> usize {
    7
}
fn default_height() -> usize {
    4
}
fn default_start_orientation() -> Orientation {
    Orientation::East
}
fn default_target() -> Cell {
    Cell::new(6, 3)
}
fn default_tick_period_ms() -> u64 {
    1
}
fn default_pwm_max() -> i32 {
    3300
}
fn default_kp_straight() -> f32 {
    22.75
}
fn default_kd_straight() -> f32 {
    10.0
}
fn default_kp_turn() -> f32 {
    90.0
}
fn default_k_sync() -> f32 {
    1000.0
}
fn default_tolerance_mm() -> f32 {
    3.0
}
fn default_settle_ticks() -> u32 {
    50
}
fn default_overshoot_bound_mm() -> f32 {
    15.0
}
fn default_overshoot_ticks() -> u32 {
    25
}
fn default_stall_ticks() -> u32 {
    400
}
fn default_stall_min_pwm() -> i32 {
    1000
}
fn default_wheel_base_mm() -> f32 {
    88.0
}
fn default_around_factor() -> f32 {
    2.0
}
fn default_cell_reference_mm() -> f32 {
    170.0
}
fn default_cell_tolerance() -> f32 {
    0.15
}
fn default_cell_quantum_mm() -> f32 {
    5.0
}
fn default_min_wall_distance_mm() -> f32 {
    30.0
}
fn default_max_measurement_mm() -> f32 {
    1000.0
}
fn default_settle_delay_ms() -> u64 {
    500
}
fn default_recalibrate_reverse_pwm() -> i32 {
    3000
}
fn default_recalibrate_reverse_ms() -> u64 {
    300
}
fn default_bumper_offset_mm() -> f32 {
    45.0
}
fn default_recalibrate_kp() -> f32 {
    100.0
}
fn default_primitive_timeout_ms() -> u64 {
    10_000
}
fn default_out_of_bounds_threshold() -> u32 {
    4
}
fn default_start_delay_ms() -> u64 {
    1000
}
fn default_run_diagnostics() -> bool {
    true
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            origin: Cell::default(),
            start_orientation: default_start_orientation(),
            target: default_target(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            pwm_max: default_pwm_max(),
            kp_straight: default_kp_straight(),
            kd_straight: default_kd_straight(),
            kp_turn: default_kp_turn(),
            k_sync: default_k_sync(),
            tolerance_mm: default_tolerance_mm(),
            settle_ticks: default_settle_ticks(),
            overshoot_bound_mm: default_overshoot_bound_mm(),
            overshoot_ticks: default_overshoot_ticks(),
            stall_ticks: default_stall_ticks(),
            stall_min_pwm: default_stall_min_pwm(),
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            wheel_base_mm: default_wheel_base_mm(),
            around_factor: default_around_factor(),
            cell_reference_mm: default_cell_reference_mm(),
            cell_tolerance: default_cell_tolerance(),
            cell_quantum_mm: default_cell_quantum_mm(),
            min_wall_distance_mm: default_min_wall_distance_mm(),
            max_measurement_mm: default_max_measurement_mm(),
            settle_delay_ms: default_settle_delay_ms(),
            recalibrate_reverse_pwm: default_recalibrate_reverse_pwm(),
            recalibrate_reverse_ms: default_recalibrate_reverse_ms(),
            bumper_offset_mm: default_bumper_offset_mm(),
            recalibrate_kp: default_recalibrate_kp(),
            primitive_timeout_ms: default_primitive_timeout_ms(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            hand: Hand::default(),
            out_of_bounds_threshold: default_out_of_bounds_threshold(),
            start_delay_ms: default_start_delay_ms(),
            run_diagnostics: default_run_diagnostics(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Derived values and validation
// ────────────────────────────────────────────────────────────────────────────

impl MazeConfig {
    /// Bounds check against the configured grid size.
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0
            && cell.y >= 0
            && (cell.x as usize) < self.width
            && (cell.y as usize) < self.height
    }
}

impl ControllerConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }
}

impl MovementConfig {
    /// Wheel arc length of a 90° turn in place: `π · wheel_base / 4`.
    pub fn quarter_turn_mm(&self) -> f32 {
        std::f32::consts::PI * self.wheel_base_mm / 4.0
    }

    /// Forward travel from back-wall contact to the centre of a nominal
    /// cell.
    pub fn recalibrate_nudge_mm(&self) -> f32 {
        self.cell_reference_mm / 2.0 - self.bumper_offset_mm
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn primitive_timeout(&self) -> Duration {
        Duration::from_millis(self.primitive_timeout_ms)
    }
}

impl RatConfig {
    /// Reject configurations the robot cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`RatError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), RatError> {
        let maze = &self.maze;
        if maze.width == 0 || maze.height == 0 {
            return Err(RatError::Config("maze width and height must be non-zero".into()));
        }
        if maze.width.saturating_mul(maze.height) > MAX_CELLS {
            return Err(RatError::Config(format!(
                "maze of {}x{} cells exceeds the {MAX_CELLS}-cell limit",
                maze.width, maze.height
            )));
        }
        if !maze.contains(maze.origin) {
            return Err(RatError::Config(format!("origin {} lies outside the maze", maze.origin)));
        }
        if !maze.contains(maze.target) {
            return Err(RatError::Config(format!("target {} lies outside the maze", maze.target)));
        }

        let c = &self.controller;
        if c.tick_period_ms == 0 {
            return Err(RatError::Config("controller.tick_period_ms must be positive".into()));
        }
        if c.pwm_max <= 0 {
            return Err(RatError::Config("controller.pwm_max must be positive".into()));
        }
        positive("controller.kp_straight", c.kp_straight)?;
        positive("controller.kp_turn", c.kp_turn)?;
        positive("controller.tolerance_mm", c.tolerance_mm)?;
        positive("controller.overshoot_bound_mm", c.overshoot_bound_mm)?;
        non_negative("controller.kd_straight", c.kd_straight)?;
        non_negative("controller.k_sync", c.k_sync)?;
        if c.settle_ticks == 0 || c.overshoot_ticks == 0 || c.stall_ticks == 0 {
            return Err(RatError::Config("controller tick counts must be positive".into()));
        }

        let m = &self.movement;
        positive("movement.wheel_base_mm", m.wheel_base_mm)?;
        positive("movement.around_factor", m.around_factor)?;
        positive("movement.cell_reference_mm", m.cell_reference_mm)?;
        positive("movement.cell_quantum_mm", m.cell_quantum_mm)?;
        positive("movement.recalibrate_kp", m.recalibrate_kp)?;
        non_negative("movement.cell_tolerance", m.cell_tolerance)?;
        non_negative("movement.bumper_offset_mm", m.bumper_offset_mm)?;
        if m.recalibrate_nudge_mm() <= 0.0 {
            return Err(RatError::Config(
                "movement.bumper_offset_mm must be less than half of cell_reference_mm".into(),
            ));
        }
        if m.primitive_timeout_ms == 0 {
            return Err(RatError::Config("movement.primitive_timeout_ms must be positive".into()));
        }
        if m.min_wall_distance_mm >= m.max_measurement_mm {
            return Err(RatError::Config(
                "movement.min_wall_distance_mm must be below max_measurement_mm".into(),
            ));
        }

        if self.navigation.out_of_bounds_threshold == 0 {
            return Err(RatError::Config(
                "navigation.out_of_bounds_threshold must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f32) -> Result<(), RatError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RatError::Config(format!("{name} must be positive, got {value}")))
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), RatError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RatError::Config(format!("{name} must not be negative, got {value}")))
    }
}
