//! Monotonic uptime clock.
//!
//! All engine timing (debounce, flush interval, file names, recovery point
//! timestamps) is read from a [`Clock`] so tests can control time.

use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

/// Source of device uptime plus a blocking sleep.
pub trait Clock {
    /// Milliseconds since boot.
    fn now_millis(&self) -> u64;

    /// Block for `duration`. Only the boot-time mount loop calls this.
    fn sleep(&self, duration: Duration);
}

/// Clock backed by [`Instant`], with boot at construction.
#[derive(Debug)]
pub struct SystemClock {
    boot: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.boot.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock. Time only moves on [`ManualClock::advance`] or
/// [`Clock::sleep`], and every sleep is recorded.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    #[must_use]
    pub fn starting_at(millis: u64) -> Self {
        Self {
            now: Cell::new(millis),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get().saturating_add(millis));
    }

    pub fn set(&self, millis: u64) {
        self.now.set(millis);
    }

    /// Sleeps requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.advance(millis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_sleep_advances_and_records() {
        let clock = ManualClock::starting_at(100);
        clock.sleep(Duration::from_millis(50));
        clock.advance(10);

        assert_eq!(clock.now_millis(), 160);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(50)]);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now_millis();
        let second = clock.now_millis();
        assert!(second >= first);
    }
}
