//! Periodic control tick.
//!
//! A [`TickTimer`] calls a [`TickHandler`] once per period while it is
//! running. The main context never calls the handler directly. It starts the
//! timer and then polls a completion flag, calling [`TickTimer::wait`]
//! between polls.
//!
//! [`ThreadTimer`] drives the handler from a dedicated background thread,
//! standing in for the hardware timer interrupt on a hosted target.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//! use microrat_hal::timer::{ThreadTimer, TickTimer};
//!
//! let ticks = Arc::new(AtomicU32::new(0));
//! let counter = Arc::clone(&ticks);
//!
//! let mut timer = ThreadTimer::new();
//! timer
//!     .start(Duration::from_millis(1), Arc::new(move || {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!     }))
//!     .unwrap();
//! timer.delay(Duration::from_millis(20));
//! timer.stop();
//!
//! assert!(ticks.load(Ordering::Relaxed) > 0);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use microrat_types::RatError;
use tracing::{debug, warn};

/// Callback executed once per control period.
pub type TickHandler = Arc<dyn Fn() + Send + Sync>;

/// A periodic tick source.
pub trait TickTimer: Send {
    /// Begin calling `handler` every `period`. Restarts the timer if it is
    /// already running.
    ///
    /// # Errors
    ///
    /// Returns [`RatError::HardwareFault`] if the tick source cannot start.
    fn start(&mut self, period: Duration, handler: TickHandler) -> Result<(), RatError>;

    /// Stop ticking. The handler is not called again after this returns.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Yield the main context until the next poll.
    fn wait(&mut self);

    /// Block the main context for `duration`.
    fn delay(&mut self, duration: Duration);
}

// ────────────────────────────────────────────────────────────────────────────
// ThreadTimer
// ────────────────────────────────────────────────────────────────────────────

/// Background-thread tick source with drift-compensated scheduling.
#[derive(Default)]
pub struct ThreadTimer {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickTimer for ThreadTimer {
    fn start(&mut self, period: Duration, handler: TickHandler) -> Result<(), RatError> {
        self.stop();
        self.running.store(true, Ordering::Release);

        let running = Arc::clone(&self.running);
        let worker = thread::Builder::new()
            .name("microrat-tick".to_string())
            .spawn(move || {
                let mut next = Instant::now();
                while running.load(Ordering::Acquire) {
                    handler();
                    next += period;
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    } else {
                        // Fell behind; do not try to catch up with a burst.
                        next = now;
                    }
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                RatError::hardware("tick_timer", e.to_string())
            })?;

        debug!(period_us = period.as_micros() as u64, "tick timer started");
        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("tick handler thread panicked");
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn wait(&mut self) {
        thread::yield_now();
    }

    fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
