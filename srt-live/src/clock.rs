//! Time sources and periodic timers
//!
//! Protocol timing is driven from outside through `tick(now)`; the clock here
//! only feeds the rolling rate windows that the controllers keep for
//! bandwidth and packet-rate estimates. Tests and the simulator swap in a
//! [`ManualClock`] so those windows are deterministic.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic microsecond time source
pub trait Clock: Send + Sync {
    /// Microseconds elapsed since the clock's own epoch
    fn now_us(&self) -> u64;
}

/// Clock backed by `std::time::Instant`
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.epoch
            .elapsed()
            .as_micros()
            .try_into()
            .unwrap_or(u64::MAX)
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time value.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_us: u64) -> Self {
        ManualClock {
            now: Arc::new(AtomicU64::new(start_us)),
        }
    }

    pub fn set(&self, now_us: u64) {
        self.now.store(now_us, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_us: u64) {
        self.now.fetch_add(delta_us, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ManualClock({}us)", self.now_us())
    }
}

/// Interval timer evaluated against caller-supplied time
///
/// Used for the receiver's periodic ACK and NAK reports.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    interval_us: u64,
    last_fire_us: u64,
}

impl Timer {
    pub fn new(interval_us: u64) -> Self {
        Timer {
            interval_us,
            last_fire_us: 0,
        }
    }

    pub fn set_interval(&mut self, interval_us: u64) {
        self.interval_us = interval_us;
    }

    /// Check if the timer has expired at `now_us`
    ///
    /// Expires once a full interval has elapsed, so a pass landing exactly
    /// on the interval boundary fires. A clock that stepped backwards counts
    /// as no time elapsed.
    pub fn expired(&self, now_us: u64) -> bool {
        now_us.saturating_sub(self.last_fire_us) >= self.interval_us
    }

    pub fn reset(&mut self, now_us: u64) {
        self.last_fire_us = now_us;
    }

    /// Fire the timer if expired, returning true if it fired
    pub fn try_fire(&mut self, now_us: u64) -> bool {
        if self.expired(now_us) {
            self.reset(now_us);
            true
        } else {
            false
        }
    }
}
