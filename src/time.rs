// src/time.rs
//! Monotonic tick counter and clock abstraction
//!
//! The control loop keeps time in a 32-bit millisecond counter that wraps
//! roughly every 49.7 days. Elapsed time is always computed with
//! [`Ticks::diff`], which interprets the wrapping difference as a signed
//! value, so comparisons stay correct across an overflow.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A point on the wrapping millisecond counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticks(pub u32);

impl Ticks {
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Advance by `ms`, wrapping at the counter width
    pub const fn wrapping_add(self, ms: u32) -> Self {
        Self(self.0.wrapping_add(ms))
    }

    /// Signed distance from `earlier` to `self`
    pub const fn diff(self, earlier: Ticks) -> i32 {
        self.0.wrapping_sub(earlier.0) as i32
    }

    /// True once at least `period_ms` has passed since `earlier`
    pub fn has_elapsed(self, earlier: Ticks, period_ms: u32) -> bool {
        i64::from(self.diff(earlier)) >= i64::from(period_ms)
    }
}

/// Time source for the control loop.
///
/// `now` is the monotonic counter used for every interval decision,
/// `local_time`/`unix_time` are wall-clock readings used only for log
/// file names and entry timestamps.
#[allow(async_fn_in_trait)]
pub trait Clock {
    fn now(&self) -> Ticks;

    fn local_time(&self) -> NaiveDateTime;

    fn unix_time(&self) -> i64;

    /// Suspend the control loop for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the OS monotonic and wall clocks
#[derive(Debug, Clone)]
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
    fn now(&self) -> Ticks {
        // Truncation is the wrap.
        Ticks(self.origin.elapsed().as_millis() as u32)
    }

    fn local_time(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn unix_time(&self) -> i64 {
        Local::now().timestamp()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
