//! In-process simulated robot for CI/CD testing without physical hardware.
//!
//! [`SimHardware`] owns one shared [`SimWorld`]: a [`SimMaze`] plus the
//! robot's true pose and wheel state. Every simulated driver is a thin view
//! onto that world, so a navigation stack wired to the sim drivers drives a
//! robot that really bumps into walls.
//!
//! # Physics
//!
//! - Wheel speed is proportional to PWM, reaching
//!   [`SimConfig::max_speed_mm_per_ms`] at full scale.
//! - Common-mode travel moves the robot along its heading and is blocked by
//!   walls; a blocked wheel does not advance its encoder.
//! - Differential travel rotates the robot in place.
//! - Motion is committed to the cell grid when the encoders are reset, which
//!   the motion layer does after every primitive: travel past half a cell
//!   moves the robot into the next cell, and rotation is rounded to whole
//!   quarter turns.
//!
//! [`SimTimer`] runs the tick handler synchronously from [`TickTimer::wait`]
//! after advancing the physics by one period, so simulated runs are fully
//! deterministic.
//!
//! # Example
//!
//! ```rust
//! use microrat_hal::sim::SimHardware;
//! use microrat_hal::sim_maze::SimMaze;
//! use microrat_hal::{Drive, WallSensors, WheelEncoders};
//! use microrat_types::{Cell, Orientation, Pose};
//!
//! let sim = SimHardware::builder(SimMaze::default_layout().unwrap())
//!     .with_start(Pose::new(Cell::new(0, 0), Orientation::East))
//!     .build();
//!
//! let sensors = sim.wall_sensors();
//! assert!(!sensors.wall_front());
//! assert!(sensors.wall_right());
//!
//! let mut wheels = sim.wheels();
//! wheels.set_wheel_speeds(3300, 3300).unwrap();
//! sim.world().advance_ms(300.0);
//! wheels.reset();
//! assert_eq!(sim.world().pose().cell, Cell::new(1, 0));
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use microrat_types::{Cell, DiagnosticReport, Orientation, Pose, RatConfig, RatError, UserEvent};
use tracing::{debug, info};

use crate::actuator::{Drive, WheelEncoders};
use crate::panel::{Diagnostics, OperatorPanel};
use crate::sensors::{LateralClearance, WallSensors};
use crate::sim_maze::SimMaze;
use crate::timer::{TickHandler, TickTimer};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Physical constants of the simulated robot and maze.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// True centre-to-centre cell pitch. Deliberately not the robot's
    /// nominal cell length, so cell-length estimation is exercised.
    pub cell_mm: f32,
    pub max_speed_mm_per_ms: f32,
    /// Distance from the robot's centre to its front or back bumper.
    pub half_body_mm: f32,
    pub pwm_max: i32,
    /// Wheel arc of a 90° turn in place.
    pub quarter_turn_mm: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::from_robot(&RatConfig::default())
    }
}

impl SimConfig {
    /// Match the simulated chassis to a robot configuration.
    pub fn from_robot(config: &RatConfig) -> Self {
        Self {
            cell_mm: 180.0,
            max_speed_mm_per_ms: 0.6,
            half_body_mm: config.movement.bumper_offset_mm,
            pwm_max: config.controller.pwm_max,
            quarter_turn_mm: config.movement.quarter_turn_mm(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// World
// ────────────────────────────────────────────────────────────────────────────

/// Ground truth shared by all simulated drivers.
#[derive(Debug)]
pub struct SimWorld {
    maze: SimMaze,
    config: SimConfig,
    start: Pose,
    pose: Pose,
    /// Travel along the heading since the robot was last centred in `pose.cell`.
    offset_mm: f32,
    /// Uncommitted rotation, positive clockwise, as wheel arc length.
    rotation_mm: f32,
    pwm: (i32, i32),
    encoders: (f32, f32),
    elapsed_us: u64,
    drive_fault: Option<String>,
}

impl SimWorld {
    fn advance(&mut self, dt_ms: f32) {
        self.elapsed_us += (f64::from(dt_ms) * 1000.0).round() as u64;
        let scale = self.config.max_speed_mm_per_ms * dt_ms / self.config.pwm_max as f32;
        let dl = self.pwm.0 as f32 * scale;
        let dr = self.pwm.1 as f32 * scale;
        if dl == 0.0 && dr == 0.0 {
            return;
        }

        let translation = (dl + dr) / 2.0;
        let rotation = (dl - dr) / 2.0;

        let heading = self.pose.orientation;
        let front_limit = self.reach(heading);
        let back_limit = self.reach(heading.opposite());
        let new_offset = (self.offset_mm + translation).clamp(-back_limit, front_limit);
        let allowed = new_offset - self.offset_mm;
        self.offset_mm = new_offset;
        self.rotation_mm += rotation;

        self.encoders.0 += (allowed + rotation).abs();
        self.encoders.1 += (allowed - rotation).abs();
    }

    /// How far the robot centre may travel from its cell centre toward
    /// `heading` before the bumper meets a wall.
    fn reach(&self, heading: Orientation) -> f32 {
        let run = self.maze.open_run(self.pose.cell, heading) as f32;
        (run + 0.5) * self.config.cell_mm - self.config.half_body_mm
    }

    fn commit(&mut self) {
        let quarter = self.config.quarter_turn_mm;
        let quarters = (self.rotation_mm / quarter).round() as i32;
        if quarters != 0 {
            self.rotation_mm -= quarters as f32 * quarter;
            for _ in 0..quarters.rem_euclid(4) {
                self.pose.orientation = self.pose.orientation.right();
            }
            self.offset_mm = 0.0;
        }

        let half = self.config.cell_mm / 2.0;
        while self.offset_mm > half {
            self.pose = self.pose.advanced();
            self.offset_mm -= self.config.cell_mm;
        }
        while self.offset_mm < -half {
            let back = self.pose.cell.neighbor(self.pose.orientation.opposite());
            self.pose = Pose::new(back, self.pose.orientation);
            self.offset_mm += self.config.cell_mm;
        }
        self.encoders = (0.0, 0.0);
        debug!(pose = %self.pose, offset_mm = self.offset_mm, "sim motion committed");
    }

    fn forward_distance_mm(&self) -> f32 {
        let run = self.maze.open_run(self.pose.cell, self.pose.orientation) as f32;
        (run + 0.5) * self.config.cell_mm - self.offset_mm
    }

    fn clearance_mm(&self, heading: Orientation) -> f32 {
        let run = self.maze.open_run(self.pose.cell, heading) as f32;
        (run + 0.5) * self.config.cell_mm
    }

    fn place(&mut self, pose: Pose) {
        self.pose = pose;
        self.offset_mm = 0.0;
        self.rotation_mm = 0.0;
        self.encoders = (0.0, 0.0);
    }
}

/// Cloneable handle onto the shared [`SimWorld`].
#[derive(Debug, Clone)]
pub struct SimWorldHandle(Arc<Mutex<SimWorld>>);

impl SimWorldHandle {
    fn lock(&self) -> MutexGuard<'_, SimWorld> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The robot's true, committed pose.
    pub fn pose(&self) -> Pose {
        self.lock().pose
    }

    /// Uncommitted travel along the heading, in millimetres.
    pub fn offset_mm(&self) -> f32 {
        self.lock().offset_mm
    }

    /// Last PWM pair commanded by the drive.
    pub fn wheel_pwm(&self) -> (i32, i32) {
        self.lock().pwm
    }

    /// Simulated time since the world was built.
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.lock().elapsed_us)
    }

    /// Integrate the physics over `dt_ms` milliseconds.
    pub fn advance_ms(&self, dt_ms: f32) {
        self.lock().advance(dt_ms);
    }

    /// Put the robot down at `pose`, centred and at rest.
    pub fn place(&self, pose: Pose) {
        self.lock().place(pose);
    }

    /// Make every subsequent drive command fail with `details`.
    pub fn inject_drive_fault(&self, details: impl Into<String>) {
        self.lock().drive_fault = Some(details.into());
    }

    pub fn clear_drive_fault(&self) {
        self.lock().drive_fault = None;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Drivers
// ────────────────────────────────────────────────────────────────────────────

/// Simulated IR/ultrasonic array reading the ground-truth maze.
pub struct SimWallSensors {
    world: SimWorldHandle,
}

impl WallSensors for SimWallSensors {
    fn id(&self) -> &str {
        "sim_sensors"
    }

    fn wall_front(&self) -> bool {
        let w = self.world.lock();
        w.maze.has_wall(w.pose.cell, w.pose.orientation)
    }

    fn wall_left(&self) -> bool {
        let w = self.world.lock();
        w.maze.has_wall(w.pose.cell, w.pose.orientation.left())
    }

    fn wall_right(&self) -> bool {
        let w = self.world.lock();
        w.maze.has_wall(w.pose.cell, w.pose.orientation.right())
    }

    fn forward_distance_mm(&self) -> f32 {
        self.world.lock().forward_distance_mm()
    }

    fn lateral_clearance_mm(&self) -> LateralClearance {
        let w = self.world.lock();
        LateralClearance {
            left_mm: w.clearance_mm(w.pose.orientation.left()),
            right_mm: w.clearance_mm(w.pose.orientation.right()),
        }
    }
}

/// Simulated motor bridge and wheel encoders.
pub struct SimWheels {
    world: SimWorldHandle,
}

impl WheelEncoders for SimWheels {
    fn left_mm(&self) -> f32 {
        self.world.lock().encoders.0
    }

    fn right_mm(&self) -> f32 {
        self.world.lock().encoders.1
    }

    fn reset(&mut self) {
        self.world.lock().commit();
    }
}

impl Drive for SimWheels {
    fn id(&self) -> &str {
        "sim_wheels"
    }

    fn set_wheel_speeds(&mut self, left: i32, right: i32) -> Result<(), RatError> {
        let mut w = self.world.lock();
        if let Some(details) = &w.drive_fault {
            return Err(RatError::hardware("sim_wheels", details.clone()));
        }
        let max = w.config.pwm_max;
        w.pwm = (left.clamp(-max, max), right.clamp(-max, max));
        Ok(())
    }
}

/// Deterministic tick source: one physics step plus one handler call per
/// [`wait`][TickTimer::wait].
pub struct SimTimer {
    world: SimWorldHandle,
    period: Duration,
    handler: Option<TickHandler>,
}

impl TickTimer for SimTimer {
    fn start(&mut self, period: Duration, handler: TickHandler) -> Result<(), RatError> {
        self.period = period;
        self.handler = Some(handler);
        Ok(())
    }

    fn stop(&mut self) {
        self.handler = None;
    }

    fn is_running(&self) -> bool {
        self.handler.is_some()
    }

    fn wait(&mut self) {
        self.world.advance_ms(self.period.as_secs_f32() * 1000.0);
        if let Some(handler) = &self.handler {
            handler();
        }
    }

    fn delay(&mut self, duration: Duration) {
        self.world.advance_ms(duration.as_secs_f32() * 1000.0);
    }
}

/// Operator who presses start whenever asked and carries the robot back to
/// the start cell once the shortest path is ready.
pub struct SimPanel {
    world: SimWorldHandle,
    events: Arc<Mutex<Vec<UserEvent>>>,
    presses_left: Option<usize>,
}

impl SimPanel {
    /// Stop pressing start after `presses` more presses.
    pub fn with_press_limit(mut self, presses: usize) -> Self {
        self.presses_left = Some(presses);
        self
    }
}

impl OperatorPanel for SimPanel {
    fn start_pressed(&mut self) -> bool {
        match &mut self.presses_left {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }

    fn signal(&mut self, event: UserEvent) {
        info!(?event, "operator signal");
        if event == UserEvent::OptimisationComplete {
            let mut w = self.world.lock();
            let start = w.start;
            w.place(start);
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Self test with a fixed outcome.
pub struct SimDiagnostics {
    report: DiagnosticReport,
}

impl Diagnostics for SimDiagnostics {
    fn run_self_test(&mut self) -> DiagnosticReport {
        self.report.clone()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimHardware builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder for [`SimHardware`].
pub struct SimHardwareBuilder {
    maze: SimMaze,
    start: Pose,
    config: SimConfig,
}

impl SimHardwareBuilder {
    /// Place the robot at `start` instead of (0,0) facing East.
    pub fn with_start(mut self, start: Pose) -> Self {
        self.start = start;
        self
    }

    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Match chassis constants and start pose to a robot configuration.
    pub fn with_robot_config(mut self, config: &RatConfig) -> Self {
        self.config = SimConfig::from_robot(config);
        self.start = Pose::new(config.maze.origin, config.maze.start_orientation);
        self
    }

    pub fn build(self) -> SimHardware {
        let world = SimWorld {
            maze: self.maze,
            config: self.config,
            start: self.start,
            pose: self.start,
            offset_mm: 0.0,
            rotation_mm: 0.0,
            pwm: (0, 0),
            encoders: (0.0, 0.0),
            elapsed_us: 0,
            drive_fault: None,
        };
        SimHardware {
            world: SimWorldHandle(Arc::new(Mutex::new(world))),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// A simulated robot in a simulated maze. Hands out driver views that all
/// share one world.
pub struct SimHardware {
    world: SimWorldHandle,
    events: Arc<Mutex<Vec<UserEvent>>>,
}

impl SimHardware {
    pub fn builder(maze: SimMaze) -> SimHardwareBuilder {
        SimHardwareBuilder {
            maze,
            start: Pose::new(Cell::new(0, 0), Orientation::East),
            config: SimConfig::default(),
        }
    }

    pub fn world(&self) -> SimWorldHandle {
        self.world.clone()
    }

    pub fn wall_sensors(&self) -> SimWallSensors {
        SimWallSensors { world: self.world() }
    }

    pub fn wheels(&self) -> SimWheels {
        SimWheels { world: self.world() }
    }

    pub fn timer(&self) -> SimTimer {
        SimTimer {
            world: self.world(),
            period: Duration::from_millis(1),
            handler: None,
        }
    }

    pub fn panel(&self) -> SimPanel {
        SimPanel {
            world: self.world(),
            events: Arc::clone(&self.events),
            presses_left: None,
        }
    }

    pub fn diagnostics(&self, report: DiagnosticReport) -> SimDiagnostics {
        SimDiagnostics { report }
    }

    /// Every event signalled to a [`SimPanel`] so far, oldest first.
    pub fn events(&self) -> Vec<UserEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> SimHardware {
        SimHardware::builder(SimMaze::default_layout().unwrap()).build()
    }

    #[test]
    fn sensors_read_ground_truth_at_start() {
        let sim = sim();
        let s = sim.wall_sensors();
        // (0,0) facing East: open ahead, wall to the left (N) and right (S).
        assert!(!s.wall_front());
        assert!(s.wall_left());
        assert!(s.wall_right());
        assert!((s.forward_distance_mm() - 6.5 * 180.0).abs() < 1e-3);
    }

    #[test]
    fn straight_travel_commits_one_cell() {
        let sim = sim();
        let mut wheels = sim.wheels();
        wheels.set_wheel_speeds(3300, 3300).unwrap();
        sim.world().advance_ms(300.0);
        wheels.set_wheel_speeds(0, 0).unwrap();
        assert!((wheels.left_mm() - 180.0).abs() < 1e-2);
        wheels.reset();
        assert_eq!(sim.world().pose(), Pose::new(Cell::new(1, 0), Orientation::East));
        assert!(sim.world().offset_mm().abs() < 1e-2);
        assert!(wheels.left_mm().abs() < f32::EPSILON);
    }

    #[test]
    fn opposite_wheels_rotate_in_place() {
        let sim = sim();
        let mut wheels = sim.wheels();
        let quarter = SimConfig::default().quarter_turn_mm;
        // Left forward, right back: clockwise.
        wheels.set_wheel_speeds(3300, -3300).unwrap();
        sim.world().advance_ms(quarter / 0.6);
        wheels.reset();
        let pose = sim.world().pose();
        assert_eq!(pose.cell, Cell::new(0, 0));
        assert_eq!(pose.orientation, Orientation::South);
    }

    #[test]
    fn walls_block_travel_and_encoders() {
        let sim = sim();
        let mut wheels = sim.wheels();
        // Back wall (West boundary) is 45 mm behind the bumper.
        wheels.set_wheel_speeds(-3300, -3300).unwrap();
        sim.world().advance_ms(500.0);
        assert!((sim.world().offset_mm() + 45.0).abs() < 1e-3);
        assert!((wheels.left_mm() - 45.0).abs() < 1e-3);
        wheels.reset();
        assert_eq!(sim.world().pose().cell, Cell::new(0, 0));
    }

    #[test]
    fn injected_fault_rejects_drive_commands() {
        let sim = sim();
        let mut wheels = sim.wheels();
        sim.world().inject_drive_fault("bridge overcurrent");
        let err = wheels.set_wheel_speeds(100, 100).unwrap_err();
        assert!(matches!(err, RatError::HardwareFault { .. }));
        sim.world().clear_drive_fault();
        assert!(wheels.set_wheel_speeds(100, 100).is_ok());
    }

    #[test]
    fn sim_timer_advances_physics_before_each_tick() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let sim = sim();
        let mut timer = sim.timer();
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        timer
            .start(Duration::from_millis(1), Arc::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }))
            .unwrap();
        for _ in 0..5 {
            timer.wait();
        }
        timer.stop();
        timer.wait();
        assert_eq!(ticks.load(Ordering::Relaxed), 5);
        assert_eq!(sim.world().elapsed(), Duration::from_millis(6));
    }

    #[test]
    fn panel_records_events_and_returns_robot_to_start() {
        let sim = sim();
        sim.world().place(Pose::new(Cell::new(6, 3), Orientation::North));
        let mut panel = sim.panel().with_press_limit(1);
        assert!(panel.start_pressed());
        assert!(!panel.start_pressed());

        panel.signal(UserEvent::TargetReached);
        panel.signal(UserEvent::OptimisationComplete);
        assert_eq!(
            sim.events(),
            vec![UserEvent::TargetReached, UserEvent::OptimisationComplete]
        );
        assert_eq!(sim.world().pose(), Pose::new(Cell::new(0, 0), Orientation::East));
    }

    #[test]
    fn diagnostics_return_configured_report() {
        let sim = sim();
        let mut diag = sim.diagnostics(DiagnosticReport::failed("left IR dead"));
        let report = diag.run_self_test();
        assert!(!report.passed);
        assert_eq!(report.details, "left IR dead");
    }
}
