//! Process-wide monotonic millisecond clock used for message and conversation ids.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Hands out millisecond values that never repeat and never go backwards,
/// even when called several times within the same wall-clock millisecond.
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    pub fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

static CLOCK: MonotonicClock = MonotonicClock::new();

/// Next value from the shared process clock.
pub fn next_millis() -> i64 {
    CLOCK.next_millis()
}
