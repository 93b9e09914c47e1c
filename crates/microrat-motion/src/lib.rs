//! `microrat-motion` – closed-loop wheel control and motion primitives.
//!
//! # Modules
//!
//! - [`controller`] – [`WheelController`]: pure per-wheel PD regulator with
//!   left/right synchronisation, overshoot and stall detection.
//! - [`control_loop`] – [`ControlLoop`]: the controller and wheel plant behind
//!   a mutex, shared between the tick context and the main context.
//! - [`movement`] – [`Movement`]: blocking primitives (`turn`,
//!   `move_one_cell`, `recalibrate`) built on the control loop, and the
//!   range-based cell length and travel estimates they use.

pub mod control_loop;
pub mod controller;
pub mod movement;

pub use control_loop::ControlLoop;
pub use controller::{MotionMode, TickStatus, WheelCommand, WheelController, WheelPair};
pub use movement::{Movement, cell_travel_mm, estimate_cell_length, recalibrate_nudge_mm};
