//! Per-wheel distance regulator.
//!
//! [`WheelController`] turns a pair of signed distance goals into PWM
//! commands, one [`tick`][WheelController::tick] at a time. It is pure: the
//! caller supplies the absolute encoder readings and applies the returned
//! command, which keeps the arithmetic testable without hardware.
//!
//! # Control law
//!
//! ```text
//! error      = goal − position
//! raw        = kp · error (+ kd · Δerror in Straight mode)
//! Straight:  sync = k_sync · (pos_R − pos_L);        L = raw_L + sync,   R = raw_R − sync
//! Turning:   sync = k_sync · (|pos_R| − |pos_L|);    L = raw_L + sync·±, R = raw_R − sync·±
//! ```
//!
//! In `Turning` mode the sync term is applied relative to each wheel's
//! command direction, so it always speeds up the wheel that has covered less
//! arc. Raw corrections and final commands are both clamped to `±pwm_max`.
//!
//! Encoders report unsigned travel. Each new delta takes the sign of the
//! command last sent to that wheel.
//!
//! # Example
//!
//! ```rust
//! use microrat_motion::controller::{MotionMode, TickStatus, WheelController, WheelPair};
//! use microrat_types::ControllerConfig;
//!
//! let mut ctl = WheelController::new(ControllerConfig::default());
//! ctl.set_goal(100.0, 100.0, MotionMode::Straight);
//!
//! let out = ctl.tick(WheelPair::new(0.0, 0.0));
//! assert_eq!(out.status, TickStatus::Running);
//! assert!(out.command.left > 0 && out.command.right > 0);
//! ```

use microrat_types::ControllerConfig;

/// Encoder travel below this is treated as "did not move".
const STALL_TRAVEL_MM: f32 = 0.01;

// ────────────────────────────────────────────────────────────────────────────
// Value types
// ────────────────────────────────────────────────────────────────────────────

/// Regulation mode of the current primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionMode {
    /// Both wheels travel the same way; PD with straight-line sync.
    #[default]
    Straight,
    /// Wheels travel in opposite directions; P only with arc sync.
    Turning,
}

/// One value per wheel, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelPair {
    pub left: f32,
    pub right: f32,
}

impl WheelPair {
    pub const ZERO: WheelPair = WheelPair { left: 0.0, right: 0.0 };

    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

/// Signed PWM counts per wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WheelCommand {
    pub left: i32,
    pub right: i32,
}

impl WheelCommand {
    pub const STOP: WheelCommand = WheelCommand { left: 0, right: 0 };
}

/// What a tick concluded about the current goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickStatus {
    Running,
    /// Both wheels held within tolerance for the whole debounce window.
    Settled,
    /// A wheel stayed past its goal beyond the overshoot bound.
    Overshoot { error: WheelPair },
    /// A strongly driven wheel reported no travel for too long.
    Stalled { position: WheelPair },
}

/// Command to apply and status of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    pub command: WheelCommand,
    pub status: TickStatus,
}

// ────────────────────────────────────────────────────────────────────────────
// WheelController
// ────────────────────────────────────────────────────────────────────────────

/// PD distance controller for a differential wheel pair.
#[derive(Debug, Clone)]
pub struct WheelController {
    config: ControllerConfig,
    kp_straight: f32,
    mode: MotionMode,
    goal: WheelPair,
    position: WheelPair,
    last_error: WheelPair,
    last_reading: WheelPair,
    /// `+1.0` or `-1.0`: direction of the last non-zero command per wheel.
    direction: WheelPair,
    last_command: WheelCommand,
    settled_ticks: u32,
    overshoot_ticks: u32,
    stalled_ticks: u32,
    ticks: u32,
}

impl WheelController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            kp_straight: config.kp_straight,
            config,
            mode: MotionMode::Straight,
            goal: WheelPair::ZERO,
            position: WheelPair::ZERO,
            last_error: WheelPair::ZERO,
            last_reading: WheelPair::ZERO,
            direction: WheelPair::new(1.0, 1.0),
            last_command: WheelCommand::STOP,
            settled_ticks: 0,
            overshoot_ticks: 0,
            stalled_ticks: 0,
            ticks: 0,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Install new per-wheel goals. Sign encodes direction.
    pub fn set_goal(&mut self, left_mm: f32, right_mm: f32, mode: MotionMode) {
        self.goal = WheelPair::new(left_mm, right_mm);
        self.mode = mode;
        self.settled_ticks = 0;
        self.overshoot_ticks = 0;
        self.stalled_ticks = 0;
        self.ticks = 0;
    }

    /// Override the straight-mode proportional gain until
    /// [`restore_gains`][Self::restore_gains].
    pub fn set_kp_straight(&mut self, kp: f32) {
        self.kp_straight = kp;
    }

    pub fn restore_gains(&mut self) {
        self.kp_straight = self.config.kp_straight;
    }

    pub fn kp_straight(&self) -> f32 {
        self.kp_straight
    }

    pub fn mode(&self) -> MotionMode {
        self.mode
    }

    pub fn goal(&self) -> WheelPair {
        self.goal
    }

    /// Signed travel accumulated since the last reset.
    pub fn position(&self) -> WheelPair {
        self.position
    }

    /// Ticks processed since the goal was set.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Zero goals, positions and history. Must be paired with an encoder
    /// reset so the next reading starts from zero again.
    pub fn reset(&mut self) {
        self.goal = WheelPair::ZERO;
        self.position = WheelPair::ZERO;
        self.last_error = WheelPair::ZERO;
        self.last_reading = WheelPair::ZERO;
        self.direction = WheelPair::new(1.0, 1.0);
        self.last_command = WheelCommand::STOP;
        self.settled_ticks = 0;
        self.overshoot_ticks = 0;
        self.stalled_ticks = 0;
        self.ticks = 0;
    }

    /// Advance the controller by one period given the absolute encoder
    /// readings.
    pub fn tick(&mut self, reading: WheelPair) -> TickOutput {
        self.ticks = self.ticks.saturating_add(1);

        let travel = WheelPair::new(
            (reading.left - self.last_reading.left).max(0.0),
            (reading.right - self.last_reading.right).max(0.0),
        );
        self.last_reading = reading;
        self.position.left += self.direction.left * travel.left;
        self.position.right += self.direction.right * travel.right;

        let error = WheelPair::new(
            self.goal.left - self.position.left,
            self.goal.right - self.position.right,
        );

        // Debounced completion.
        let tolerance = self.config.tolerance_mm;
        if error.left.abs() <= tolerance && error.right.abs() <= tolerance {
            self.settled_ticks = self.settled_ticks.saturating_add(1);
        } else {
            self.settled_ticks = 0;
        }
        if self.settled_ticks >= self.config.settle_ticks {
            return self.halt(TickStatus::Settled, error);
        }

        // Overshoot past the goal in the direction of travel.
        let bound = self.config.overshoot_bound_mm;
        if past_goal(self.goal.left, error.left, bound) || past_goal(self.goal.right, error.right, bound) {
            self.overshoot_ticks = self.overshoot_ticks.saturating_add(1);
        } else {
            self.overshoot_ticks = 0;
        }
        if self.overshoot_ticks >= self.config.overshoot_ticks {
            return self.halt(TickStatus::Overshoot { error }, error);
        }

        // Driven hard but not moving.
        let min_pwm = self.config.stall_min_pwm;
        let stuck = |command: i32, moved: f32| command.abs() >= min_pwm && moved < STALL_TRAVEL_MM;
        if stuck(self.last_command.left, travel.left) || stuck(self.last_command.right, travel.right) {
            self.stalled_ticks = self.stalled_ticks.saturating_add(1);
        } else {
            self.stalled_ticks = 0;
        }
        if self.stalled_ticks >= self.config.stall_ticks {
            let position = self.position;
            return self.halt(TickStatus::Stalled { position }, error);
        }

        let command = self.regulate(error);
        self.last_error = error;
        self.last_command = command;
        if command.left != 0 {
            self.direction.left = (command.left as f32).signum();
        }
        if command.right != 0 {
            self.direction.right = (command.right as f32).signum();
        }
        TickOutput {
            command,
            status: TickStatus::Running,
        }
    }

    fn regulate(&self, error: WheelPair) -> WheelCommand {
        let max = self.config.pwm_max as f32;
        let (mut left, mut right) = match self.mode {
            MotionMode::Straight => (
                self.kp_straight * error.left + self.config.kd_straight * (error.left - self.last_error.left),
                self.kp_straight * error.right + self.config.kd_straight * (error.right - self.last_error.right),
            ),
            MotionMode::Turning => (self.config.kp_turn * error.left, self.config.kp_turn * error.right),
        };
        left = left.clamp(-max, max);
        right = right.clamp(-max, max);

        match self.mode {
            MotionMode::Straight => {
                let sync = self.config.k_sync * (self.position.right - self.position.left);
                left += sync;
                right -= sync;
            }
            MotionMode::Turning => {
                let sync = self.config.k_sync * (self.position.right.abs() - self.position.left.abs());
                left += sync * left.signum();
                right -= sync * right.signum();
            }
        }

        WheelCommand {
            left: left.clamp(-max, max) as i32,
            right: right.clamp(-max, max) as i32,
        }
    }

    fn halt(&mut self, status: TickStatus, error: WheelPair) -> TickOutput {
        self.last_error = error;
        self.last_command = WheelCommand::STOP;
        TickOutput {
            command: WheelCommand::STOP,
            status,
        }
    }
}

/// `true` when a wheel has travelled more than `bound` beyond `goal`. A wheel
/// with a zero goal may drift `bound` either way.
fn past_goal(goal: f32, error: f32, bound: f32) -> bool {
    if goal == 0.0 {
        error.abs() > bound
    } else {
        -error * goal.signum() > bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> WheelController {
        WheelController::new(ControllerConfig::default())
    }

    #[test]
    fn reaches_goal_within_debounce_window() {
        let mut ctl = controller();
        ctl.set_goal(100.0, 100.0, MotionMode::Straight);
        let at_goal = WheelPair::new(100.0, 100.0);

        for tick in 1..50 {
            let out = ctl.tick(at_goal);
            assert_eq!(out.status, TickStatus::Running, "tick {tick}");
            assert_eq!(out.command, WheelCommand::STOP);
        }
        let out = ctl.tick(at_goal);
        assert_eq!(out.status, TickStatus::Settled);
        assert_eq!(out.command, WheelCommand::STOP);
        // Stays settled while in tolerance.
        assert_eq!(ctl.tick(at_goal).command, WheelCommand::STOP);
    }

    #[test]
    fn straight_first_tick_is_pd() {
        let mut ctl = controller();
        ctl.set_goal(100.0, 100.0, MotionMode::Straight);
        let out = ctl.tick(WheelPair::ZERO);
        // 22.75·100 + 10·(100 − 0) = 3275
        assert_eq!(out.command, WheelCommand { left: 3275, right: 3275 });
    }

    #[test]
    fn commands_clamp_to_pwm_max() {
        let mut ctl = controller();
        ctl.set_goal(1000.0, -1000.0, MotionMode::Turning);
        let out = ctl.tick(WheelPair::ZERO);
        assert_eq!(out.command, WheelCommand { left: 3300, right: -3300 });
    }

    #[test]
    fn turning_is_proportional_only() {
        let mut ctl = controller();
        ctl.set_goal(10.0, -10.0, MotionMode::Turning);
        let out = ctl.tick(WheelPair::ZERO);
        assert_eq!(out.command, WheelCommand { left: 900, right: -900 });
    }

    #[test]
    fn travel_takes_sign_of_last_command() {
        let mut ctl = controller();
        ctl.set_goal(50.0, -50.0, MotionMode::Turning);
        ctl.tick(WheelPair::ZERO);
        ctl.tick(WheelPair::new(10.0, 10.0));
        let p = ctl.position();
        assert!((p.left - 10.0).abs() < 1e-4);
        assert!((p.right + 10.0).abs() < 1e-4);
    }

    #[test]
    fn straight_sync_boosts_lagging_wheel() {
        let mut ctl = controller();
        ctl.set_goal(100.0, 100.0, MotionMode::Straight);
        ctl.tick(WheelPair::ZERO);
        // Right wheel 2 mm ahead.
        let out = ctl.tick(WheelPair::new(10.0, 12.0));
        // L: 22.75·90 + 10·(90−100) + 1000·2 → clamped to 3300
        // R: 22.75·88 + 10·(88−100) − 1000·2 = −118
        assert_eq!(out.command, WheelCommand { left: 3300, right: -118 });
    }

    #[test]
    fn turning_sync_compares_magnitudes() {
        let mut ctl = controller();
        ctl.set_goal(50.0, -50.0, MotionMode::Turning);
        ctl.tick(WheelPair::ZERO);
        // |R| = 11 ahead of |L| = 10 → L pushed further forward, R eased off.
        let out = ctl.tick(WheelPair::new(10.0, 11.0));
        // L: 90·40 → 3300 (clamp) + 1000 → 3300
        // R: 90·(−39) = −3510 → −3300, then −(1000·−1) → −2300
        assert_eq!(out.command, WheelCommand { left: 3300, right: -2300 });
    }

    #[test]
    fn sustained_overshoot_is_reported() {
        let mut ctl = controller();
        ctl.set_goal(10.0, 10.0, MotionMode::Straight);
        let past = WheelPair::new(40.0, 40.0);
        for _ in 1..25 {
            assert_eq!(ctl.tick(past).status, TickStatus::Running);
        }
        let out = ctl.tick(past);
        assert!(matches!(out.status, TickStatus::Overshoot { .. }));
        assert_eq!(out.command, WheelCommand::STOP);
    }

    #[test]
    fn blocked_wheel_is_reported_as_stall() {
        let config = ControllerConfig {
            stall_ticks: 5,
            ..ControllerConfig::default()
        };
        let mut ctl = WheelController::new(config);
        ctl.set_goal(500.0, 500.0, MotionMode::Straight);
        // First tick issues the command; the next five see no travel.
        for _ in 0..5 {
            assert_eq!(ctl.tick(WheelPair::ZERO).status, TickStatus::Running);
        }
        let out = ctl.tick(WheelPair::ZERO);
        assert!(matches!(out.status, TickStatus::Stalled { .. }));
    }

    #[test]
    fn gentle_commands_never_count_as_stall() {
        let config = ControllerConfig {
            stall_ticks: 3,
            ..ControllerConfig::default()
        };
        let mut ctl = WheelController::new(config);
        // 22.75·20 + 10·20 = 655 < stall_min_pwm
        ctl.set_goal(20.0, 20.0, MotionMode::Straight);
        for _ in 0..10 {
            assert_eq!(ctl.tick(WheelPair::ZERO).status, TickStatus::Running);
        }
    }

    #[test]
    fn boosted_gain_is_restored() {
        let mut ctl = controller();
        ctl.set_kp_straight(100.0);
        assert!((ctl.kp_straight() - 100.0).abs() < f32::EPSILON);
        ctl.restore_gains();
        assert!((ctl.kp_straight() - 22.75).abs() < f32::EPSILON);
    }

    #[test]
    fn reset_clears_progress() {
        let mut ctl = controller();
        ctl.set_goal(30.0, 30.0, MotionMode::Straight);
        ctl.tick(WheelPair::ZERO);
        ctl.tick(WheelPair::new(5.0, 5.0));
        ctl.reset();
        assert_eq!(ctl.position(), WheelPair::ZERO);
        assert_eq!(ctl.goal(), WheelPair::ZERO);
        assert_eq!(ctl.ticks(), 0);
    }
}
