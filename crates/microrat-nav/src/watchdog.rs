//! [`BoundsWatchdog`] – detects an explorer that has left the maze.
//!
//! A wall follower always has a wall on at least one sensed side. A run of
//! consecutive steps with nothing in front, left or right means the robot
//! has escaped the maze or its sensors have failed. The watchdog counts such
//! steps and trips once the count exceeds the configured threshold. Any wall
//! sighting clears the count.
//!
//! # Example
//!
//! ```rust
//! use microrat_nav::watchdog::{BoundsStatus, BoundsWatchdog};
//! use microrat_types::WallReading;
//!
//! let mut dog = BoundsWatchdog::new(1);
//! let open = WallReading::new(false, false, false);
//!
//! assert_eq!(dog.observe(open), BoundsStatus::Searching { open_steps: 1 });
//! assert_eq!(dog.observe(open), BoundsStatus::Lost);
//!
//! dog.reset();
//! assert_eq!(dog.observe(WallReading::new(true, false, false)), BoundsStatus::InContact);
//! ```

use microrat_types::WallReading;
use tracing::warn;

/// Verdict after one exploration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsStatus {
    /// At least one wall is in view.
    InContact,
    /// No wall in view for `open_steps` steps, still within tolerance.
    Searching { open_steps: u32 },
    /// The sensing gap exceeded the threshold.
    Lost,
}

/// Consecutive open-reading counter.
#[derive(Debug, Clone)]
pub struct BoundsWatchdog {
    threshold: u32,
    open_steps: u32,
}

impl BoundsWatchdog {
    /// Trip after more than `threshold` consecutive open readings.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            open_steps: 0,
        }
    }

    /// Feed the reading taken after an exploration step.
    pub fn observe(&mut self, reading: WallReading) -> BoundsStatus {
        if !reading.is_open() {
            self.open_steps = 0;
            return BoundsStatus::InContact;
        }
        self.open_steps = self.open_steps.saturating_add(1);
        if self.open_steps > self.threshold {
            warn!(
                open_steps = self.open_steps,
                threshold = self.threshold,
                "no wall in view, explorer is out of bounds"
            );
            BoundsStatus::Lost
        } else {
            warn!(open_steps = self.open_steps, "no wall in view");
            BoundsStatus::Searching {
                open_steps: self.open_steps,
            }
        }
    }

    pub fn open_steps(&self) -> u32 {
        self.open_steps
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.open_steps = 0;
    }
}
