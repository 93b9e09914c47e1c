//! Controller state shared between the tick context and the main context.
//!
//! The tick handler and the main loop both touch the controller: the tick
//! advances it, the main loop installs goals and polls for completion. All
//! multi-field state sits behind one [`Mutex`] held for a single tick or a
//! single query; completion and fault flags are [`AtomicBool`]s so a poll
//! that finds nothing to report never takes the lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use microrat_hal::{TickHandler, WheelPlant};
use microrat_types::RatError;
use tracing::{debug, warn};

use crate::controller::{MotionMode, TickStatus, WheelCommand, WheelController, WheelPair};

struct LoopState {
    controller: WheelController,
    plant: Box<dyn WheelPlant>,
    fault: Option<RatError>,
}

struct Shared {
    state: Mutex<LoopState>,
    reached: AtomicBool,
    faulted: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self) {
        if self.reached.load(Ordering::Acquire) || self.faulted.load(Ordering::Acquire) {
            return;
        }
        let mut state = self.lock();
        let reading = WheelPair::new(state.plant.left_mm(), state.plant.right_mm());
        let output = state.controller.tick(reading);

        if let Err(e) = state.plant.set_wheel_speeds(output.command.left, output.command.right) {
            if let Err(stop_error) = state.plant.stop() {
                warn!(error = %stop_error, "failed to stop wheels after drive fault");
            }
            self.latch(&mut state, e);
            return;
        }

        match output.status {
            TickStatus::Running => {}
            TickStatus::Settled => {
                self.reached.store(true, Ordering::Release);
            }
            TickStatus::Overshoot { error } => {
                let reason = format!(
                    "overshoot past goal (error L {:.1} mm, R {:.1} mm)",
                    error.left, error.right
                );
                self.latch(&mut state, RatError::Stall { reason });
            }
            TickStatus::Stalled { position } => {
                let reason = format!(
                    "no wheel travel under load at L {:.1} mm, R {:.1} mm",
                    position.left, position.right
                );
                self.latch(&mut state, RatError::Stall { reason });
            }
        }
    }

    fn latch(&self, state: &mut LoopState, error: RatError) {
        warn!(%error, "control loop fault latched");
        state.fault = Some(error);
        self.faulted.store(true, Ordering::Release);
    }
}

/// A [`WheelController`] and the wheel pair it drives, shared with a tick
/// source.
///
/// # Example
///
/// ```rust
/// use microrat_hal::sim::SimHardware;
/// use microrat_hal::sim_maze::SimMaze;
/// use microrat_motion::{ControlLoop, MotionMode, WheelController};
/// use microrat_types::ControllerConfig;
///
/// let sim = SimHardware::builder(SimMaze::default_layout().unwrap()).build();
/// let control = ControlLoop::new(
///     WheelController::new(ControllerConfig::default()),
///     Box::new(sim.wheels()),
/// );
///
/// control.set_goal(5.0, 5.0, MotionMode::Straight);
/// let tick = control.handler();
/// for _ in 0..400 {
///     sim.world().advance_ms(1.0);
///     tick();
/// }
/// assert!(control.is_goal_reached().unwrap());
/// ```
pub struct ControlLoop {
    shared: Arc<Shared>,
}

impl ControlLoop {
    pub fn new(controller: WheelController, plant: Box<dyn WheelPlant>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LoopState {
                    controller,
                    plant,
                    fault: None,
                }),
                reached: AtomicBool::new(false),
                faulted: AtomicBool::new(false),
            }),
        }
    }

    /// A handler for a [`TickTimer`][microrat_hal::TickTimer] that advances
    /// this loop once per call.
    pub fn handler(&self) -> TickHandler {
        let shared = Arc::clone(&self.shared);
        Arc::new(move || shared.tick())
    }

    /// Run one tick from the calling context.
    pub fn tick(&self) {
        self.shared.tick();
    }

    /// Install a new goal and clear the completion flag.
    pub fn set_goal(&self, left_mm: f32, right_mm: f32, mode: MotionMode) {
        let mut state = self.shared.lock();
        state.controller.set_goal(left_mm, right_mm, mode);
        self.shared.reached.store(false, Ordering::Release);
        debug!(left_mm, right_mm, ?mode, "controller goal set");
    }

    /// Poll for completion.
    ///
    /// Returns `Ok(true)` once the goal has settled; the tick has already
    /// commanded zero speed by then, and the caller stops its timer.
    ///
    /// # Errors
    ///
    /// Returns the latched fault ([`RatError::Stall`] or
    /// [`RatError::HardwareFault`]) if the tick gave up on the goal.
    pub fn is_goal_reached(&self) -> Result<bool, RatError> {
        if self.shared.faulted.load(Ordering::Acquire) {
            let mut state = self.shared.lock();
            self.shared.faulted.store(false, Ordering::Release);
            let error = state.fault.take().unwrap_or_else(|| RatError::Stall {
                reason: "control loop faulted".to_string(),
            });
            return Err(error);
        }
        Ok(self.shared.reached.load(Ordering::Acquire))
    }

    /// Ticks processed since the current goal was set.
    pub fn ticks(&self) -> u32 {
        self.shared.lock().controller.ticks()
    }

    pub fn position(&self) -> WheelPair {
        self.shared.lock().controller.position()
    }

    /// Zero the controller and the encoders, and clear all flags.
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        state.controller.reset();
        state.plant.reset();
        state.fault = None;
        self.shared.reached.store(false, Ordering::Release);
        self.shared.faulted.store(false, Ordering::Release);
    }

    /// Command zero speed on both wheels.
    ///
    /// # Errors
    ///
    /// Propagates the driver's [`RatError::HardwareFault`].
    pub fn halt(&self) -> Result<(), RatError> {
        self.shared.lock().plant.stop()
    }

    /// Bypass the controller and command raw PWM.
    ///
    /// # Errors
    ///
    /// Propagates the driver's [`RatError::HardwareFault`].
    pub fn drive_open_loop(&self, left: i32, right: i32) -> Result<(), RatError> {
        let command = WheelCommand { left, right };
        debug!(?command, "open-loop drive");
        self.shared.lock().plant.set_wheel_speeds(left, right)
    }

    pub fn set_kp_straight(&self, kp: f32) {
        self.shared.lock().controller.set_kp_straight(kp);
    }

    pub fn restore_gains(&self) {
        self.shared.lock().controller.restore_gains();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use microrat_hal::{Drive, WheelEncoders};
    use microrat_types::ControllerConfig;

    /// Wheels that sit at a fixed reading and record the last command.
    struct FixedWheels {
        reading: f32,
        commands: Arc<Mutex<Vec<(i32, i32)>>>,
        fail: bool,
    }

    impl WheelEncoders for FixedWheels {
        fn left_mm(&self) -> f32 {
            self.reading
        }

        fn right_mm(&self) -> f32 {
            self.reading
        }

        fn reset(&mut self) {
            self.reading = 0.0;
        }
    }

    impl Drive for FixedWheels {
        fn id(&self) -> &str {
            "fixed"
        }

        fn set_wheel_speeds(&mut self, left: i32, right: i32) -> Result<(), RatError> {
            if self.fail {
                return Err(RatError::hardware("fixed", "bridge offline"));
            }
            self.commands.lock().unwrap().push((left, right));
            Ok(())
        }
    }

    fn control(reading: f32, fail: bool) -> (ControlLoop, Arc<Mutex<Vec<(i32, i32)>>>) {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let wheels = FixedWheels {
            reading,
            commands: Arc::clone(&commands),
            fail,
        };
        let control = ControlLoop::new(WheelController::new(ControllerConfig::default()), Box::new(wheels));
        (control, commands)
    }

    #[test]
    fn settles_and_stops_ticking() {
        let (control, commands) = control(100.0, false);
        control.set_goal(100.0, 100.0, MotionMode::Straight);
        let handler = control.handler();
        for _ in 0..49 {
            handler();
            assert!(!control.is_goal_reached().unwrap());
        }
        handler();
        assert!(control.is_goal_reached().unwrap());
        assert_eq!(commands.lock().unwrap().last(), Some(&(0, 0)));

        // Further ticks are ignored once the goal is reached.
        let issued = commands.lock().unwrap().len();
        handler();
        assert_eq!(commands.lock().unwrap().len(), issued);
    }

    #[test]
    fn driver_error_is_latched_and_surfaced_once() {
        let (control, _) = control(0.0, true);
        control.set_goal(50.0, 50.0, MotionMode::Straight);
        control.tick();
        let err = control.is_goal_reached().unwrap_err();
        // The follow-up stop fails too; the original fault is the one kept.
        assert!(matches!(&err, RatError::HardwareFault { details, .. } if details == "bridge offline"), "{err}");
        assert!(!control.is_goal_reached().unwrap());
    }

    #[test]
    fn overshoot_is_surfaced_as_stall() {
        // Encoders already 50 mm past a 50 mm goal and never moving back.
        let (control, commands) = control(100.0, false);
        control.set_goal(50.0, 50.0, MotionMode::Straight);
        let overshoot_ticks = ControllerConfig::default().overshoot_ticks;
        for _ in 1..overshoot_ticks {
            control.tick();
            assert!(!control.is_goal_reached().unwrap());
        }
        control.tick();
        match control.is_goal_reached() {
            Err(RatError::Stall { reason }) => assert!(reason.contains("overshoot"), "{reason}"),
            other => panic!("expected an overshoot stall, got {other:?}"),
        }
        assert_eq!(commands.lock().unwrap().last(), Some(&(0, 0)));
    }

    #[test]
    fn reset_zeroes_encoders_and_flags() {
        let (control, _) = control(100.0, false);
        control.set_goal(100.0, 100.0, MotionMode::Straight);
        for _ in 0..50 {
            control.tick();
        }
        assert!(control.is_goal_reached().unwrap());
        control.reset();
        assert!(!control.is_goal_reached().unwrap());
        assert_eq!(control.position(), WheelPair::ZERO);
        assert_eq!(control.ticks(), 0);
    }
}
