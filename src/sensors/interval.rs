//! Fixed-period readiness.
//!
//! Composed into every sensor that takes a reading on a schedule rather
//! than on an interrupt.  The next timeout is kept as an absolute time so
//! it does not drift when a cycle runs late.

use crate::ports::Millis;
use crate::sensors::{Deadline, Readiness};

#[derive(Debug, Clone, Copy)]
pub struct IntervalTimer {
    interval: Millis,
    next_timeout: Millis,
}

impl IntervalTimer {
    /// First expiry is at `now`, so a fresh timer fires on the first poll.
    pub fn new(interval: Millis, now: Millis) -> Self {
        Self {
            interval: interval.max(1),
            next_timeout: now,
        }
    }

    pub fn interval(&self) -> Millis {
        self.interval
    }

    pub fn next_timeout(&self) -> Millis {
        self.next_timeout
    }

    /// `Ready` once per period.  Firing schedules the next timeout one
    /// interval from `now`.
    pub fn poll(&mut self, now: Millis) -> Readiness {
        if now >= self.next_timeout {
            self.next_timeout = now.saturating_add(self.interval);
            Readiness::Ready
        } else {
            Readiness::Wait(Deadline::At(self.next_timeout))
        }
    }

    /// Push the next expiry to at least `at`.
    pub fn defer_until(&mut self, at: Millis) {
        self.next_timeout = self.next_timeout.max(at);
    }
}
