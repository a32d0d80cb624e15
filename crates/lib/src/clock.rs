//! Time provider abstraction
//!
//! Entity timestamps (`createdAt`, `updatedAt`) and the time component of
//! generated identifiers come from a [`Clock`]. Production code uses
//! [`SystemClock`]; tests inject a [`FixedClock`] so that timestamps and ids
//! are reproducible.
//!
//! # Example
//!
//! ```
//! use pagetree::{Clock, FixedClock};
//!
//! let clock = FixedClock::new(1000);
//! let t1 = clock.now_millis();
//! let t2 = clock.now_millis();
//! assert!(t2 > t1);
//! ```

use std::fmt::Debug;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of wall-clock milliseconds.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Deterministic clock for tests.
///
/// Every call to `now_millis()` returns the current value and then advances
/// it by one millisecond, so consecutive timestamps are strictly increasing.
/// `hold()` freezes the clock until the returned guard is dropped.
pub struct FixedClock {
    state: Mutex<FixedClockState>,
}

struct FixedClockState {
    millis: u64,
    held: bool,
}

/// RAII guard that freezes a [`FixedClock`] while held.
pub struct ClockHold<'a>(&'a FixedClock);

impl Drop for ClockHold<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.state.lock() {
            state.held = false;
        }
    }
}

impl FixedClock {
    /// Create a clock starting at the given time in milliseconds.
    pub fn new(millis: u64) -> Self {
        Self {
            state: Mutex::new(FixedClockState {
                millis,
                held: false,
            }),
        }
    }

    /// Freeze the clock until the guard is dropped.
    pub fn hold(&self) -> ClockHold<'_> {
        self.with_state(|state| state.held = true);
        ClockHold(self)
    }

    /// Advance the clock by `ms` milliseconds.
    pub fn advance(&self, ms: u64) {
        self.with_state(|state| state.millis += ms);
    }

    /// Jump to an absolute time.
    pub fn set(&self, ms: u64) {
        self.with_state(|state| state.millis = ms);
    }

    /// Current value, without advancing.
    pub fn get(&self) -> u64 {
        self.with_state(|state| state.millis)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FixedClockState) -> R) -> R {
        // A poisoned lock only means another test thread panicked mid-update;
        // the counter itself is still usable.
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.with_state(|state| {
            let t = state.millis;
            if !state.held {
                state.millis += 1;
            }
            t
        })
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1704067200000)
    }
}

impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (millis, held) = self.with_state(|state| (state.millis, state.held));
        f.debug_struct("FixedClock")
            .field("millis", &millis)
            .field("held", &held)
            .finish()
    }
}

/// Render a millisecond timestamp as RFC3339, for display purposes.
pub fn format_millis(millis: u64) -> String {
    use chrono::{TimeZone, Utc};
    let secs = (millis / 1000) as i64;
    let nanos = ((millis % 1000) * 1_000_000) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "1970-01-01T00:00:00+00:00".to_string())
}
