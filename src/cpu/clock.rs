//! Host-side tick scheduling.
//!
//! The machine never waits. Whoever drives a running machine keeps a
//! [`Ticker`] and calls [`Machine::tick`](crate::Machine::tick) each time
//! [`Ticker::poll`] says an interval has elapsed.

use std::time::{Duration, Instant};

/// Fires at most once per elapsed interval.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    interval: Duration,
    deadline: Instant,
}

impl Ticker {
    /// A ticker whose first tick is due one interval after `now`.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            deadline: now + interval,
        }
    }

    /// Build from a millisecond delay.
    pub fn from_millis(delay_ms: u64, now: Instant) -> Self {
        Self::new(Duration::from_millis(delay_ms), now)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval. The next tick is due one new interval after `now`.
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        self.restart(now);
    }

    /// Push the next tick to one interval after `now`.
    pub fn restart(&mut self, now: Instant) {
        self.deadline = now + self.interval;
    }

    /// Returns `true` if a tick is due, and schedules the following one.
    ///
    /// A host that falls far behind gets one tick per poll, not a burst.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.deadline {
            return false;
        }
        self.deadline += self.interval;
        if self.deadline < now {
            self.deadline = now + self.interval;
        }
        true
    }

    /// Time left until the next tick is due.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }
}
