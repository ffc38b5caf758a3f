//! Time source for file lifecycle decisions
//!
//! Every age computation in the buffer (write window, read window, expiry)
//! goes through a [`Clock`] handed to the storage at construction time.
//! There is no process-wide time provider.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Supplies the current wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current time in milliseconds.
    fn now_millis(&self) -> u64;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // Pre-epoch system time is clamped to zero.
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Manually driven clock.
///
/// Time only moves when [`ManualClock::set`] or [`ManualClock::advance`]
/// is called, which makes every lifecycle transition reproducible.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `start_millis`.
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Move forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
