//! Blocking motion primitives.
//!
//! Each primitive installs a goal on the [`ControlLoop`], starts the tick
//! timer, polls until the controller settles and then resets the controller
//! and encoders before a short settle pause. A primitive either completes
//! physically or returns an error with the wheels stopped.

use std::time::Duration;

use microrat_hal::{TickTimer, WallSensors};
use microrat_types::{MovementConfig, RatConfig, RatError, TurnDirection};
use tracing::{debug, warn};

use crate::control_loop::ControlLoop;
use crate::controller::MotionMode;

/// Estimate the centre-to-centre cell length from a forward range reading.
///
/// Readings outside `[min_wall_distance_mm, max_measurement_mm]` are not
/// trusted and yield the nominal reference. Otherwise the number of cells to
/// the wall ahead is inferred, the reading is divided by it (the robot sits
/// half a cell into the first one), and the result is clamped to the
/// tolerance band around the reference and rounded to `cell_quantum_mm`.
///
/// ```rust
/// use microrat_motion::estimate_cell_length;
/// use microrat_types::MovementConfig;
///
/// let config = MovementConfig::default();
/// // Wall 1.5 cells ahead in a maze with 180 mm cells.
/// assert!((estimate_cell_length(&config, 270.0) - 180.0).abs() < 1e-3);
/// // Too close to trust.
/// assert!((estimate_cell_length(&config, 12.0) - 170.0).abs() < 1e-3);
/// ```
pub fn estimate_cell_length(config: &MovementConfig, forward_mm: f32) -> f32 {
    let reference = config.cell_reference_mm;
    if !trusted(config, forward_mm) {
        return reference;
    }
    let cells = (forward_mm / reference - 0.5).round().max(0.0);
    let raw = forward_mm / (cells + 0.5);
    let band = reference * config.cell_tolerance;
    let clamped = raw.clamp(reference - band, reference + band);
    let quantum = config.cell_quantum_mm;
    (clamped / quantum).round() * quantum
}

/// Forward travel that ends on the centre of the next cell.
///
/// The wall ahead is the reference: a robot facing a wall `n` cells away
/// should stop `(n - ½)` cell lengths short of it. Measuring the travel that
/// way absorbs any offset the robot carries from its current cell centre,
/// which a fixed cell length would keep. Untrusted readings fall back to one
/// [`estimate_cell_length`].
///
/// ```rust
/// use microrat_motion::cell_travel_mm;
/// use microrat_types::MovementConfig;
///
/// let config = MovementConfig::default();
/// // Centred, wall 2.5 cells of 180 mm ahead: exactly one cell.
/// assert!((cell_travel_mm(&config, 450.0) - 180.0).abs() < 1e-3);
/// // 10 mm behind centre, wall 5.5 cells ahead: 10 mm extra.
/// assert!((cell_travel_mm(&config, 1000.0) - 190.0).abs() < 1e-3);
/// ```
pub fn cell_travel_mm(config: &MovementConfig, forward_mm: f32) -> f32 {
    let pitch = estimate_cell_length(config, forward_mm);
    if !trusted(config, forward_mm) {
        return pitch;
    }
    let cells = (forward_mm / pitch - 0.5).round().max(1.0);
    (forward_mm - (cells - 0.5) * pitch).max(0.0)
}

/// Forward nudge from back-wall contact to the cell centre.
///
/// With the rear bumper on the wall, the wall ahead is a whole number of
/// cells from the wall behind, which gives the local cell length directly.
/// Untrusted readings fall back to
/// [`MovementConfig::recalibrate_nudge_mm`].
pub fn recalibrate_nudge_mm(config: &MovementConfig, forward_mm: f32) -> f32 {
    let fallback = config.recalibrate_nudge_mm();
    if !trusted(config, forward_mm) {
        return fallback;
    }
    let reference = config.cell_reference_mm;
    let span = forward_mm + config.bumper_offset_mm;
    let cells = (span / reference).round().max(1.0);
    let band = reference * config.cell_tolerance;
    let pitch = (span / cells).clamp(reference - band, reference + band);
    (pitch / 2.0 - config.bumper_offset_mm).max(0.0)
}

fn trusted(config: &MovementConfig, forward_mm: f32) -> bool {
    forward_mm.is_finite()
        && forward_mm >= config.min_wall_distance_mm
        && forward_mm <= config.max_measurement_mm
}

/// Motion primitives over a control loop and its tick source.
pub struct Movement {
    control: ControlLoop,
    timer: Box<dyn TickTimer>,
    config: MovementConfig,
    period: Duration,
}

impl Movement {
    pub fn new(control: ControlLoop, timer: Box<dyn TickTimer>, config: &RatConfig) -> Self {
        Self {
            control,
            timer,
            config: config.movement.clone(),
            period: config.controller.tick_period(),
        }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Turn in place. [`TurnDirection::None`] is a no-op; a turn-around is
    /// followed by [`recalibrate`][Self::recalibrate].
    ///
    /// # Errors
    ///
    /// Returns [`RatError::Stall`] or [`RatError::HardwareFault`] if the
    /// turn cannot complete. The wheels are stopped.
    pub fn turn(&mut self, direction: TurnDirection, sensors: &dyn WallSensors) -> Result<(), RatError> {
        let quarter = self.config.quarter_turn_mm();
        let (left, right) = match direction {
            TurnDirection::None => return Ok(()),
            TurnDirection::Right => (quarter, -quarter),
            TurnDirection::Left => (-quarter, quarter),
            TurnDirection::Around => {
                let arc = quarter * self.config.around_factor;
                let clearance = sensors.lateral_clearance_mm();
                if clearance.left_mm > clearance.right_mm {
                    (-arc, arc)
                } else {
                    (arc, -arc)
                }
            }
        };
        debug!(?direction, left_mm = left, right_mm = right, "turn");
        self.run(left, right, MotionMode::Turning)?;
        if direction == TurnDirection::Around {
            self.recalibrate(sensors)?;
        }
        Ok(())
    }

    /// Drive forward to the centre of the next cell, see [`cell_travel_mm`].
    ///
    /// # Errors
    ///
    /// See [`turn`][Self::turn].
    pub fn move_one_cell(&mut self, sensors: &dyn WallSensors) -> Result<(), RatError> {
        let forward = sensors.forward_distance_mm();
        let travel = cell_travel_mm(&self.config, forward);
        debug!(forward_mm = forward, travel_mm = travel, "move one cell");
        self.run(travel, travel, MotionMode::Straight)
    }

    /// Square up against the wall behind: reverse open-loop into it, then
    /// nudge forward to the cell centre (see [`recalibrate_nudge_mm`]) with a
    /// stiffer straight gain.
    ///
    /// # Errors
    ///
    /// See [`turn`][Self::turn].
    pub fn recalibrate(&mut self, sensors: &dyn WallSensors) -> Result<(), RatError> {
        let pwm = -self.config.recalibrate_reverse_pwm;
        if let Err(e) = self.control.drive_open_loop(pwm, pwm) {
            self.abort();
            return Err(e);
        }
        self.timer.delay(Duration::from_millis(self.config.recalibrate_reverse_ms));
        if let Err(e) = self.control.halt() {
            self.abort();
            return Err(e);
        }
        self.reset_controller();

        let forward = sensors.forward_distance_mm();
        let nudge = recalibrate_nudge_mm(&self.config, forward);
        debug!(forward_mm = forward, nudge_mm = nudge, kp = self.config.recalibrate_kp, "recalibrate nudge");
        self.control.set_kp_straight(self.config.recalibrate_kp);
        let result = self.run(nudge, nudge, MotionMode::Straight);
        self.control.restore_gains();
        result
    }

    /// Stop the tick and the wheels.
    ///
    /// # Errors
    ///
    /// Propagates the driver's [`RatError::HardwareFault`].
    pub fn stop(&mut self) -> Result<(), RatError> {
        self.timer.stop();
        self.control.halt()
    }

    /// Block the main context without ticking the controller.
    pub fn pause(&mut self, duration: Duration) {
        self.timer.delay(duration);
    }

    fn run(&mut self, left_mm: f32, right_mm: f32, mode: MotionMode) -> Result<(), RatError> {
        self.control.set_goal(left_mm, right_mm, mode);
        if let Err(e) = self.timer.start(self.period, self.control.handler()) {
            self.abort();
            return Err(e);
        }

        let period_ms = self.period.as_millis().max(1);
        let tick_budget = u32::try_from(self.config.primitive_timeout().as_millis() / period_ms)
            .unwrap_or(u32::MAX);
        loop {
            match self.control.is_goal_reached() {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => {
                    self.abort();
                    return Err(e);
                }
            }
            if self.control.ticks() > tick_budget {
                self.abort();
                return Err(RatError::Stall {
                    reason: format!("primitive did not settle within {tick_budget} ticks"),
                });
            }
            self.timer.wait();
        }

        self.timer.stop();
        self.reset_controller();
        Ok(())
    }

    fn reset_controller(&mut self) {
        self.control.reset();
        self.timer.delay(self.config.settle_delay());
    }

    fn abort(&mut self) {
        self.timer.stop();
        if let Err(e) = self.control.halt() {
            warn!(error = %e, "failed to stop wheels after motion fault");
        }
        self.control.reset();
    }
}
