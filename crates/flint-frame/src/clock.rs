//! Time sources for the frame loop.
//!
//! The loop never reads the wall clock directly; it asks a [`Clock`] for the
//! current time in seconds. [`SystemClock`] is the real thing, [`ManualClock`]
//! is hand-advanced so tests can drive the loop deterministically.

use std::cell::Cell;
use std::time::Instant;

/// Monotonic time source, in seconds since an arbitrary epoch.
pub trait Clock {
    /// Current time in seconds. Must never decrease.
    fn now(&self) -> f64;
}

/// Wall clock backed by [`Instant`]. The epoch is the moment of construction.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Creates a clock whose epoch is the current instant.
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
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Hand-advanced clock for tests and headless drivers.
///
/// Starts at zero; [`advance`](Self::advance) moves time forward.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    /// Creates a clock frozen at t = 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `dt` seconds. Negative values are ignored.
    pub fn advance(&self, dt: f64) {
        if dt > 0.0 {
            self.now.set(self.now.get() + dt);
        }
    }

    /// Jumps the clock to an absolute time, if it is later than the current one.
    pub fn set(&self, t: f64) {
        if t > self.now.get() {
            self.now.set(t);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        clock.advance(0.5);
        clock.advance(0.25);
        assert!((clock.now() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_manual_clock_ignores_negative_advance() {
        let clock = ManualClock::new();
        clock.advance(1.0);
        clock.advance(-0.5);
        assert!((clock.now() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_manual_clock_set_is_monotonic() {
        let clock = ManualClock::new();
        clock.set(2.0);
        clock.set(1.0);
        assert!((clock.now() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
