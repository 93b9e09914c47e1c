//! One-sided wall following.
//!
//! Keep a hand on one wall and the robot will walk every corridor of a maze
//! whose walls are all connected. Priority for the followed side `S` and the
//! opposite side `O`:
//!
//! 1. `S` open → turn toward `S`.
//! 2. `S` and front closed, `O` open → turn toward `O`.
//! 3. All three closed → turn around.
//! 4. Otherwise → straight on.

use microrat_types::{Hand, TurnDirection, WallReading};

/// Pick the turn to make before the next one-cell move.
///
/// ```rust
/// use microrat_nav::wall_follower::decide;
/// use microrat_types::{Hand, TurnDirection, WallReading};
///
/// // Front blocked, left open, right blocked.
/// let reading = WallReading::new(true, false, true);
/// assert_eq!(decide(Hand::Left, reading), TurnDirection::Left);
/// ```
pub fn decide(hand: Hand, reading: WallReading) -> TurnDirection {
    let (followed, opposite, toward, away) = match hand {
        Hand::Left => (reading.left, reading.right, TurnDirection::Left, TurnDirection::Right),
        Hand::Right => (reading.right, reading.left, TurnDirection::Right, TurnDirection::Left),
    };

    if !followed {
        toward
    } else if !reading.front {
        TurnDirection::None
    } else if !opposite {
        away
    } else {
        TurnDirection::Around
    }
}
