use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::foundation::core::ClockTime;

/// Pipeline clock. Running time of an element is `now() - base_time`.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> ClockTime;
}

/// Monotonic clock starting at zero on creation.
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> ClockTime {
        let ns = self.origin.elapsed().as_nanos();
        ClockTime(u64::try_from(ns).unwrap_or(u64::MAX))
    }
}

/// Clock advanced by hand, for offline hosts and tests.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Jump to `t`.
    pub fn set(&self, t: ClockTime) {
        self.now.store(t.0, Ordering::SeqCst);
    }

    /// Move forward by `d`.
    pub fn advance(&self, d: ClockTime) {
        self.now.fetch_add(d.0, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> ClockTime {
        ClockTime(self.now.load(Ordering::SeqCst))
    }
}
