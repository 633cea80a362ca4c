//! Frame clocks
//!
//! The scheduler never reads wall time directly. It asks a [`Clock`] for a
//! millisecond timestamp at the start of every frame, so hosts can plug in
//! their own vsync timestamp and tests can step time by hand.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// Source of frame timestamps in milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// Monotonic wall clock measured from its creation
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// A hand-driven clock for headless runs and tests.
///
/// Clones share the same time position.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock already positioned at `ms`
    pub fn starting_at(ms: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(ms)),
        }
    }

    /// Move time forward. Negative deltas are ignored; frame time never runs backwards.
    pub fn advance(&self, delta_ms: f64) {
        if delta_ms > 0.0 {
            *self.now.lock() += delta_ms;
        }
    }

    /// Jump to an absolute position, if it is not in the past
    pub fn set(&self, ms: f64) {
        let mut now = self.now.lock();
        if ms > *now {
            *now = ms;
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now.lock()
    }
}
