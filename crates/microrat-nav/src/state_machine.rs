//! [`Navigator`] – the run sequencer.
//!
//! ```text
//! Idle ──start──▶ Explore ──target──▶ WaitReport ──2× start──▶ ShortestPath
//!  ▲                 │                                             │
//!  └──── fault / out of bounds ◀───────────────┴──── RunComplete ───┘
//! ```
//!
//! Each call to [`Navigator::step`] performs at most one move. Exploration
//! follows one wall with [`wall_follower::decide`] and records the walls seen
//! after every move. Once the target is reached, the first start press
//! solves the map with flood-fill and reports it; the second returns the
//! robot to the origin for the shortest-path run, which follows
//! [`move_selector::next_move`][crate::move_selector::next_move] down the
//! distance gradient. The shortest-path run keeps reading the walls. A wall
//! the map did not have triggers a fresh flood-fill, and a dead end is left
//! by turning around.
//!
//! A motion fault or a sensing gap ends the run: the wheels are stopped, the
//! operator is told, the machine drops back to `Idle` and the error is
//! returned to the caller.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use microrat_hal::{Diagnostics, OperatorPanel, WallSensors};
use microrat_maze::compute_distances;
use microrat_motion::Movement;
use microrat_types::{NavigationConfig, RatConfig, RatError, TurnDirection, UserEvent};
use tracing::{debug, info, warn};

use crate::context::RobotContext;
use crate::move_selector::{next_move, retreat};
use crate::wall_follower;
use crate::watchdog::BoundsStatus;

// ────────────────────────────────────────────────────────────────────────────
// NavState
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavState {
    #[default]
    Idle,
    Explore,
    WaitReport,
    ShortestPath,
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NavState::Idle => "idle",
            NavState::Explore => "explore",
            NavState::WaitReport => "wait_report",
            NavState::ShortestPath => "shortest_path",
        };
        f.write_str(name)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Navigator
// ────────────────────────────────────────────────────────────────────────────

/// Exploration, reporting and shortest-path state machine.
pub struct Navigator {
    state: NavState,
    context: RobotContext,
    movement: Movement,
    sensors: Box<dyn WallSensors>,
    panel: Box<dyn OperatorPanel>,
    diagnostics: Option<Box<dyn Diagnostics>>,
    config: NavigationConfig,
    diagnostics_done: bool,
    awaiting_ack: bool,
    target_signalled: bool,
    report_sent: bool,
}

impl Navigator {
    /// # Errors
    ///
    /// Returns [`RatError::Config`] if `config` does not validate.
    pub fn new(
        config: &RatConfig,
        movement: Movement,
        sensors: Box<dyn WallSensors>,
        panel: Box<dyn OperatorPanel>,
    ) -> Result<Self, RatError> {
        Ok(Self {
            state: NavState::Idle,
            context: RobotContext::from_config(config)?,
            movement,
            sensors,
            panel,
            diagnostics: None,
            config: config.navigation.clone(),
            diagnostics_done: false,
            awaiting_ack: false,
            target_signalled: false,
            report_sent: false,
        })
    }

    /// Run `diagnostics` once, before the first exploration, when
    /// `navigation.run_diagnostics` is enabled.
    pub fn with_diagnostics(mut self, diagnostics: Box<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn context(&self) -> &RobotContext {
        &self.context
    }

    /// Advance the state machine by one step.
    ///
    /// Returns the state the machine is in afterwards.
    ///
    /// # Errors
    ///
    /// - [`RatError::DiagnosticsFailed`] when the self test fails; the
    ///   machine stays `Idle` and the next start press acknowledges it.
    /// - [`RatError::Stall`] or [`RatError::HardwareFault`] when a move
    ///   fails; the run is abandoned.
    /// - [`RatError::OutOfBounds`] when exploration loses the maze.
    pub fn step(&mut self) -> Result<NavState, RatError> {
        match self.state {
            NavState::Idle => self.step_idle(),
            NavState::Explore => self.step_explore(),
            NavState::WaitReport => self.step_wait_report(),
            NavState::ShortestPath => self.step_shortest_path(),
        }
    }

    /// Step until a started run has finished and the machine is back in
    /// `Idle`. A failed self test is reported and then acknowledged by the
    /// next start press.
    ///
    /// # Errors
    ///
    /// Propagates run-ending errors from [`step`][Self::step]. Returns
    /// [`RatError::Stall`] if the run is still going after `max_steps`.
    pub fn run(&mut self, max_steps: usize) -> Result<(), RatError> {
        self.run_until_cancelled(max_steps, &AtomicBool::new(false))
    }

    /// [`run`][Self::run], checking `cancel` before every step. A
    /// cancelled run is stopped with [`emergency_stop`][Self::emergency_stop].
    ///
    /// # Errors
    ///
    /// As [`run`][Self::run]; cancellation is reported as
    /// [`RatError::Stall`].
    pub fn run_until_cancelled(&mut self, max_steps: usize, cancel: &AtomicBool) -> Result<(), RatError> {
        let mut started = self.state != NavState::Idle;
        for _ in 0..max_steps {
            if cancel.load(Ordering::Acquire) {
                self.emergency_stop();
                return Err(RatError::Stall {
                    reason: "run cancelled by operator".to_string(),
                });
            }
            match self.step() {
                Ok(NavState::Idle) if started => return Ok(()),
                Ok(NavState::Idle) => {}
                Ok(_) => started = true,
                Err(RatError::DiagnosticsFailed { report }) => {
                    warn!(%report, "self test failed, waiting for acknowledgement");
                }
                Err(e) => return Err(e),
            }
        }
        Err(RatError::Stall {
            reason: format!("run did not finish within {max_steps} steps"),
        })
    }

    /// Abandon the current run and stop the wheels.
    pub fn emergency_stop(&mut self) {
        self.halt();
        if self.state != NavState::Idle {
            warn!(pose = %self.context.pose, state = %self.state, "emergency stop");
            self.panel.signal(UserEvent::RunFailed {
                reason: "emergency stop".to_string(),
            });
            self.transition(NavState::Idle);
        }
    }

    // ── Idle ───────────────────────────────────────────────────────────────

    fn step_idle(&mut self) -> Result<NavState, RatError> {
        if !self.panel.start_pressed() {
            return Ok(NavState::Idle);
        }
        self.movement
            .pause(Duration::from_millis(self.config.start_delay_ms));

        if self.awaiting_ack {
            warn!("self test failure acknowledged, starting exploration");
            self.awaiting_ack = false;
        } else if self.config.run_diagnostics && !self.diagnostics_done {
            if let Some(diagnostics) = self.diagnostics.as_mut() {
                let report = diagnostics.run_self_test();
                self.diagnostics_done = true;
                info!(passed = report.passed, details = %report.details, "self test");
                self.panel.signal(UserEvent::DiagnosticsResult {
                    passed: report.passed,
                    report: report.details.clone(),
                });
                if !report.passed {
                    self.awaiting_ack = true;
                    return Err(RatError::DiagnosticsFailed {
                        report: report.details,
                    });
                }
            }
        }

        self.context.reset_for_run();
        let reading = self.sensors.read();
        self.context.grid.record_walls(self.context.pose, reading);
        self.target_signalled = false;
        self.report_sent = false;
        Ok(self.transition(NavState::Explore))
    }

    // ── Explore ────────────────────────────────────────────────────────────

    fn step_explore(&mut self) -> Result<NavState, RatError> {
        let reading = self.sensors.read();
        let turn = wall_follower::decide(self.context.hand, reading);
        debug!(pose = %self.context.pose, ?reading, ?turn, "explore decision");
        if let Err(e) = self.drive(turn) {
            return Err(self.fail(e));
        }

        let cell = self.context.pose.cell;
        if !self.context.grid.is_valid(cell) {
            return Err(self.out_of_bounds());
        }
        let reading = self.sensors.read();
        self.context.grid.record_walls(self.context.pose, reading);
        if self.context.watchdog.observe(reading) == BoundsStatus::Lost {
            return Err(self.out_of_bounds());
        }

        if self.context.at_target() {
            info!(pose = %self.context.pose, "target reached");
            return Ok(self.transition(NavState::WaitReport));
        }
        Ok(NavState::Explore)
    }

    // ── WaitReport ─────────────────────────────────────────────────────────

    fn step_wait_report(&mut self) -> Result<NavState, RatError> {
        if !self.target_signalled {
            if let Err(e) = self.movement.stop() {
                return Err(self.fail(e));
            }
            self.panel.signal(UserEvent::TargetReached);
            self.target_signalled = true;
        }
        if !self.panel.start_pressed() {
            return Ok(NavState::WaitReport);
        }

        if !self.report_sent {
            compute_distances(&mut self.context.grid, self.context.target);
            let report = self.context.grid.report();
            info!(
                origin_distance = self.context.grid.distance_at(self.context.origin.cell),
                "map solved"
            );
            debug!("{report}");
            self.panel.signal(UserEvent::MapReport(report));
            self.report_sent = true;
            return Ok(NavState::WaitReport);
        }

        self.panel.signal(UserEvent::OptimisationComplete);
        self.context.return_to_origin();
        Ok(self.transition(NavState::ShortestPath))
    }

    // ── ShortestPath ───────────────────────────────────────────────────────

    fn step_shortest_path(&mut self) -> Result<NavState, RatError> {
        let pose = self.context.pose;
        let reading = self.sensors.read();
        if self.context.grid.record_walls(pose, reading) {
            compute_distances(&mut self.context.grid, self.context.target);
            info!(
                pose = %pose,
                distance = self.context.grid.distance_at(pose.cell),
                "new walls seen, route replanned"
            );
        }

        let distance = self.context.grid.distance_at(pose.cell);
        if distance == 0 {
            if let Err(e) = self.movement.stop() {
                return Err(self.fail(e));
            }
            info!(pose = %pose, "shortest-path run complete");
            self.panel.signal(UserEvent::RunComplete);
            return Ok(self.transition(NavState::Idle));
        }

        let mut step = next_move(pose, &self.context.grid);
        if !step.makes_progress(pose) {
            match retreat(pose, &self.context.grid) {
                Some(back) => step = back,
                None => {
                    return Err(self.fail(RatError::Stall {
                        reason: format!("no downhill neighbour at {pose} (distance {distance})"),
                    }));
                }
            }
        }
        debug!(from = %pose, to = %step.cell, turn = ?step.turn, distance, "shortest-path step");
        if let Err(e) = self.drive(step.turn) {
            return Err(self.fail(e));
        }
        Ok(NavState::ShortestPath)
    }

    // ── Helpers ────────────────────────────────────────────────────────────

    /// Turn, then move one cell, updating the pose after each completes.
    fn drive(&mut self, turn: TurnDirection) -> Result<(), RatError> {
        self.movement.turn(turn, self.sensors.as_ref())?;
        self.context.pose = self.context.pose.turned(turn);
        self.movement.move_one_cell(self.sensors.as_ref())?;
        self.context.pose = self.context.pose.advanced();
        Ok(())
    }

    fn transition(&mut self, next: NavState) -> NavState {
        info!(from = %self.state, to = %next, "navigation state change");
        self.state = next;
        next
    }

    fn halt(&mut self) {
        if let Err(e) = self.movement.stop() {
            warn!(error = %e, "failed to stop wheels");
        }
    }

    fn fail(&mut self, error: RatError) -> RatError {
        warn!(%error, pose = %self.context.pose, "run failed");
        self.halt();
        self.panel.signal(UserEvent::RunFailed {
            reason: error.to_string(),
        });
        self.transition(NavState::Idle);
        error
    }

    fn out_of_bounds(&mut self) -> RatError {
        let cell = self.context.pose.cell;
        warn!(%cell, "explorer out of bounds");
        self.halt();
        self.panel.signal(UserEvent::OutOfBounds);
        self.transition(NavState::Idle);
        RatError::OutOfBounds { cell }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
