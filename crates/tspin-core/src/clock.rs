#![forbid(unsafe_code)]

//! Monotonic time sources for the spin timer.
//!
//! The engine never sleeps or spawns; it compares deadlines against a
//! [`Clock`]. Production hosts use [`SystemClock`]. Tests and simulations use
//! [`LabClock`], which only moves when told to, so auto-repeat timelines are
//! reproducible tick for tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use web_time::{Duration, Instant};

/// Source of "now" for deadline comparisons.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-clock time via `web_time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A manually-advanceable clock for deterministic tests.
///
/// Clones share the same timeline, so a test can hand one clone to the
/// engine and keep another to advance time.
#[derive(Debug, Clone)]
pub struct LabClock {
    epoch: Instant,
    offset_us: Arc<AtomicU64>,
}

impl LabClock {
    /// Create a new lab clock starting at `Instant::now()`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            offset_us: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Advance the lab clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        let us = delta.as_micros().min(u64::MAX as u128) as u64;
        self.offset_us.fetch_add(us, Ordering::Release);
    }

    /// Advance the lab clock by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Time elapsed since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.offset_us.load(Ordering::Acquire))
    }
}

impl Default for LabClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for LabClock {
    fn now(&self) -> Instant {
        self.epoch + self.elapsed()
    }
}
