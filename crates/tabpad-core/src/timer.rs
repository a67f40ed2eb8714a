//! Deadline-based single-shot timers.
//!
//! The core never sleeps or spawns timer threads. Each document owns one [`Debouncer`] per
//! purpose (highlight recompute, history commit); the host calls `poll(now)` from its event
//! loop and a timer fires once its deadline has passed. Time is always passed in explicitly,
//! which keeps every timing rule deterministic under test.

use std::time::{Duration, Instant};

/// A resettable single-shot timer.
///
/// Scheduling while armed replaces the previous deadline, so at most one firing is pending.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Create a disarmed timer with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// The quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arm the timer so it fires `delay` after `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Disarm the timer.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns `true` if a firing is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire if the deadline has passed. Firing disarms the timer.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
