//! Wall and range sensing.
//!
//! Drivers turn raw IR/ultrasonic samples into wall-presence booleans and
//! millimetre distances. Thresholding and calibration curves belong to the
//! driver; the navigation core only sees the result.

use microrat_types::WallReading;

/// Free distance to the nearest wall on each side of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LateralClearance {
    pub left_mm: f32,
    pub right_mm: f32,
}

/// Wall-presence and range sensors mounted on the robot.
pub trait WallSensors: Send {
    /// Stable identifier used in fault messages, e.g. `"ir_array"`.
    fn id(&self) -> &str;

    fn wall_front(&self) -> bool;

    fn wall_left(&self) -> bool;

    fn wall_right(&self) -> bool;

    /// Forward range to the next wall in millimetres.
    fn forward_distance_mm(&self) -> f32;

    fn lateral_clearance_mm(&self) -> LateralClearance;

    /// Sample all three wall sensors together.
    fn read(&self) -> WallReading {
        WallReading::new(self.wall_front(), self.wall_left(), self.wall_right())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSensors {
        reading: WallReading,
    }

    impl WallSensors for FixedSensors {
        fn id(&self) -> &str {
            "fixed"
        }

        fn wall_front(&self) -> bool {
            self.reading.front
        }

        fn wall_left(&self) -> bool {
            self.reading.left
        }

        fn wall_right(&self) -> bool {
            self.reading.right
        }

        fn forward_distance_mm(&self) -> f32 {
            255.0
        }

        fn lateral_clearance_mm(&self) -> LateralClearance {
            LateralClearance { left_mm: 40.0, right_mm: 90.0 }
        }
    }

    #[test]
    fn read_samples_every_side() {
        let sensors = FixedSensors {
            reading: WallReading::new(true, false, true),
        };
        assert_eq!(sensors.read(), WallReading::new(true, false, true));
        assert!(!sensors.read().is_open());
    }
}
