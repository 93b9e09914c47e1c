//! `microrat-hal` – the robot's hardware seams.
//!
//! The navigation core never touches registers or GPIO. It talks to the
//! traits defined here, so the same code drives the physical robot and the
//! in-process simulator used by the test suite.
//!
//! # Modules
//!
//! - [`sensors`] – [`WallSensors`]: wall presence and range readings.
//! - [`actuator`] – [`WheelEncoders`] and [`Drive`]: wheel feedback and PWM
//!   output, bundled as a [`WheelPlant`].
//! - [`timer`] – [`TickTimer`] plus the background-thread [`ThreadTimer`].
//! - [`panel`] – [`OperatorPanel`] and [`Diagnostics`].
//! - [`sim_maze`] – ASCII maze layouts for the simulator.
//! - [`sim`] – [`SimHardware`][sim::SimHardware]: a simulated robot in a
//!   simulated maze.

pub mod actuator;
pub mod panel;
pub mod sensors;
pub mod sim;
pub mod sim_maze;
pub mod timer;

pub use actuator::{Drive, WheelEncoders, WheelPlant};
pub use panel::{Diagnostics, OperatorPanel};
pub use sensors::{LateralClearance, WallSensors};
pub use timer::{ThreadTimer, TickHandler, TickTimer};
