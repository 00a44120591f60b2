#![forbid(unsafe_code)]

//! Auto-repeat timer as an explicit three-phase state machine.
//!
//! ```text
//!   Idle ──arm──▶ PendingFirstRepeat ──delay elapsed──▶ Repeating ─┐
//!    ▲                     │                               ▲   tick │
//!    └──────cancel─────────┴───────────cancel──────────────┴────────┘
//! ```
//!
//! The machine owns at most one deadline at a time: the delay deadline while
//! pending, the next tick while repeating. Arming always replaces whatever was
//! there, so there is never more than one live delay or interval.
//!
//! The first repeat tick fires one full interval after the delay elapses.

use web_time::{Duration, Instant};

/// Shortest interval the machine will repeat at.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Phase of the auto-repeat cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpinPhase {
    #[default]
    Idle,
    /// Waiting for the initial delay to elapse.
    PendingFirstRepeat { due: Instant },
    /// Ticking every interval; `next` is the next tick.
    Repeating { next: Instant },
}

#[derive(Debug, Clone, Default)]
pub struct SpinTimer {
    phase: SpinPhase,
}

impl SpinTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> SpinPhase {
        self.phase
    }

    #[inline]
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.phase != SpinPhase::Idle
    }

    /// Replace any pending deadline with a fresh delay starting at `now`.
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.phase = SpinPhase::PendingFirstRepeat { due: now + delay };
    }

    /// Drop the pending deadline. Returns whether one was live.
    pub fn cancel(&mut self) -> bool {
        std::mem::take(&mut self.phase) != SpinPhase::Idle
    }

    /// When the machine next needs attention.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            SpinPhase::Idle => None,
            SpinPhase::PendingFirstRepeat { due } => Some(due),
            SpinPhase::Repeating { next } => Some(next),
        }
    }

    /// Advance to `now` and consume one due tick.
    ///
    /// An elapsed delay moves the machine to `Repeating`; a tick that is due
    /// is consumed and `true` returned. Call repeatedly to drain every
    /// overdue tick.
    pub fn take_tick(&mut self, now: Instant, interval: Duration) -> bool {
        let interval = interval.max(MIN_INTERVAL);
        if let SpinPhase::PendingFirstRepeat { due } = self.phase {
            if now < due {
                return false;
            }
            self.phase = SpinPhase::Repeating {
                next: due + interval,
            };
        }
        match self.phase {
            SpinPhase::Repeating { next } if now >= next => {
                self.phase = SpinPhase::Repeating {
                    next: next + interval,
                };
                true
            }
            _ => false,
        }
    }

    /// Schedule the next tick one interval after `now`, dropping any backlog.
    pub fn rebase(&mut self, now: Instant, interval: Duration) {
        if let SpinPhase::Repeating { .. } = self.phase {
            self.phase = SpinPhase::Repeating {
                next: now + interval.max(MIN_INTERVAL),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);
    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn idle_never_ticks() {
        let mut timer = SpinTimer::new();
        let now = Instant::now();
        assert!(!timer.take_tick(now + Duration::from_secs(10), INTERVAL));
        assert_eq!(timer.next_deadline(), None);
        assert!(!timer.cancel());
    }

    #[test]
    fn delay_then_interval() {
        let t0 = Instant::now();
        let mut timer = SpinTimer::new();
        timer.arm(t0, DELAY);
        assert_eq!(timer.phase(), SpinPhase::PendingFirstRepeat { due: t0 + DELAY });

        assert!(!timer.take_tick(t0 + Duration::from_millis(499), INTERVAL));
        // Delay elapsed: now repeating, but no tick until one interval later.
        assert!(!timer.take_tick(t0 + DELAY, INTERVAL));
        assert_eq!(
            timer.phase(),
            SpinPhase::Repeating {
                next: t0 + DELAY + INTERVAL
            }
        );
        assert!(timer.take_tick(t0 + Duration::from_millis(600), INTERVAL));
        assert!(!timer.take_tick(t0 + Duration::from_millis(650), INTERVAL));
        assert!(timer.take_tick(t0 + Duration::from_millis(700), INTERVAL));
    }

    #[test]
    fn overdue_ticks_drain_one_at_a_time() {
        let t0 = Instant::now();
        let mut timer = SpinTimer::new();
        timer.arm(t0, DELAY);
        let later = t0 + Duration::from_millis(950);
        let mut ticks = 0;
        while timer.take_tick(later, INTERVAL) {
            ticks += 1;
        }
        // Ticks at 600, 700, 800, 900.
        assert_eq!(ticks, 4);
        assert_eq!(timer.next_deadline(), Some(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn rearm_replaces_deadline() {
        let t0 = Instant::now();
        let mut timer = SpinTimer::new();
        timer.arm(t0, DELAY);
        timer.arm(t0 + Duration::from_millis(300), DELAY);
        assert_eq!(timer.next_deadline(), Some(t0 + Duration::from_millis(800)));
        assert!(timer.cancel());
        assert!(!timer.is_armed());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let t0 = Instant::now();
        let mut timer = SpinTimer::new();
        timer.arm(t0, Duration::ZERO);
        let now = t0 + Duration::from_millis(3);
        let mut ticks = 0;
        while timer.take_tick(now, Duration::ZERO) {
            ticks += 1;
        }
        assert_eq!(ticks, 3);
    }

    #[test]
    fn rebase_drops_backlog() {
        let t0 = Instant::now();
        let mut timer = SpinTimer::new();
        timer.arm(t0, Duration::ZERO);
        assert!(!timer.take_tick(t0, INTERVAL));
        let now = t0 + Duration::from_secs(5);
        timer.rebase(now, INTERVAL);
        assert_eq!(timer.next_deadline(), Some(now + INTERVAL));
    }
}
