//! Wheel feedback and drive output.
//!
//! [`WheelEncoders`] report *unsigned* travel: the counters only ever grow,
//! and the controller attaches a sign from the direction it last commanded.
//! [`Drive`] takes signed PWM counts per wheel.
//!
//! The control loop owns both halves of a wheel pair through the
//! [`WheelPlant`] bundle, which every type implementing both traits gets for
//! free.

use microrat_types::RatError;

/// Distance counters on the two drive wheels.
pub trait WheelEncoders: Send {
    /// Total travel of the left wheel since the last [`reset`][Self::reset],
    /// in millimetres. Never negative.
    fn left_mm(&self) -> f32;

    /// Total travel of the right wheel since the last reset.
    fn right_mm(&self) -> f32;

    /// Zero both counters.
    fn reset(&mut self);
}

/// Differential PWM output to the two drive motors.
pub trait Drive: Send {
    /// Stable identifier for this driver, e.g. `"motor_bridge"`.
    fn id(&self) -> &str;

    /// Command signed PWM counts. Positive drives the wheel forward.
    ///
    /// # Errors
    ///
    /// Returns [`RatError::HardwareFault`] if the driver rejects the command.
    fn set_wheel_speeds(&mut self, left: i32, right: i32) -> Result<(), RatError>;

    /// Command zero on both wheels.
    ///
    /// # Errors
    ///
    /// See [`Drive::set_wheel_speeds`].
    fn stop(&mut self) -> Result<(), RatError> {
        self.set_wheel_speeds(0, 0)
    }
}

/// Encoders and motors of one wheel pair.
pub trait WheelPlant: WheelEncoders + Drive {}

impl<T: WheelEncoders + Drive> WheelPlant for T {}
