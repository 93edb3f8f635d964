//! Millisecond clock abstraction.
//!
//! Every scheduled check in the firmware takes a `now` timestamp instead of
//! reading the time itself, so tests can drive time with [`ManualClock`]
//! while the device uses [`SystemClock`].

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Milliseconds since the clock was created (boot, on the device).
pub type Millis = u64;

/// Source of the current time.
pub trait Clock {
    /// Current time in milliseconds.
    fn now_ms(&self) -> Millis;
}

/// Monotonic clock backed by [`Instant`].
///
/// On ESP-IDF `Instant` is backed by the high resolution `esp_timer`.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Create a clock starting at zero.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.start.elapsed().as_millis() as Millis
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    /// Create a clock at the given time.
    pub fn new(start: Millis) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by.as_millis() as Millis);
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

/// Milliseconds elapsed between `since` and `now`, zero if `now` is earlier.
pub fn elapsed_ms(now: Millis, since: Millis) -> Millis {
    now.saturating_sub(since)
}

/// Convert a [`Duration`] into clock units.
pub fn as_millis(duration: Duration) -> Millis {
    duration.as_millis() as Millis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(1_000);
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now_ms(), 1_250);

        clock.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_elapsed_never_underflows() {
        assert_eq!(elapsed_ms(100, 40), 60);
        assert_eq!(elapsed_ms(40, 100), 0);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
