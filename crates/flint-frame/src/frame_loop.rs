//! Fixed-timestep accumulator loop.
//!
//! Each frame the loop folds the elapsed wall time into an accumulator and
//! runs the update callback at a fixed rate, then runs the render callback
//! exactly once. How a large backlog is consumed is governed by
//! [`CatchUpPolicy`], which the caller picks explicitly.

use tracing::warn;

use crate::clock::Clock;

/// Default update period: 60 Hz.
pub const DEFAULT_PERIOD: f64 = 1.0 / 60.0;

/// Default catch-up cap for [`CatchUpPolicy::Capped`].
///
/// Four steps at 60 Hz absorbs roughly a 66 ms hitch before updates are
/// dropped, comparable to clamping frame time at ~250 ms / 4 FPS.
pub const DEFAULT_MAX_CATCH_UP: u32 = 4;

/// How the loop consumes accumulated simulation backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchUpPolicy {
    /// At most one update per frame, advancing the update boundary by exactly
    /// one period. Backlog is never discarded, so under sustained slow frames
    /// the loop falls permanently behind real time. This reproduces the
    /// historical behavior and exists so callers can opt into it knowingly.
    Single,
    /// Run up to `max_steps` updates per frame. If backlog still exceeds one
    /// period after that, the excess whole periods are dropped and a warning
    /// is logged. The loop accepts slowdown instead of spiraling.
    Capped {
        /// Maximum update invocations per frame. Must be at least 1.
        max_steps: u32,
    },
}

impl Default for CatchUpPolicy {
    fn default() -> Self {
        Self::Capped {
            max_steps: DEFAULT_MAX_CATCH_UP,
        }
    }
}

/// Fixed-timestep loop state: accumulator, period, and counters.
///
/// Call [`tick`](Self::tick) once per frame with the clock that measures
/// elapsed time, or [`step`](Self::step) with an explicit frame time.
#[derive(Debug)]
pub struct FrameLoop {
    period: f64,
    policy: CatchUpPolicy,
    accumulator: f64,
    previous: Option<f64>,
    update_count: u64,
    frame_count: u64,
    last_render_ms: f64,
}

impl FrameLoop {
    /// Creates a loop with the given fixed update period (seconds) and policy.
    ///
    /// Non-positive periods fall back to [`DEFAULT_PERIOD`].
    pub fn new(period: f64, policy: CatchUpPolicy) -> Self {
        let period = if period > 0.0 { period } else { DEFAULT_PERIOD };
        Self {
            period,
            policy,
            accumulator: 0.0,
            previous: None,
            update_count: 0,
            frame_count: 0,
            last_render_ms: 0.0,
        }
    }

    /// Creates a loop updating at `hz` updates per second.
    pub fn from_hz(hz: u32, policy: CatchUpPolicy) -> Self {
        Self::new(1.0 / f64::from(hz.max(1)), policy)
    }

    /// Runs one frame, measuring elapsed time since the previous call via
    /// `clock`. The first call observes zero elapsed time.
    ///
    /// Returns the number of update invocations this frame.
    pub fn tick(
        &mut self,
        clock: &dyn Clock,
        update: impl FnMut(),
        render: impl FnMut(),
    ) -> u32 {
        let now = clock.now();
        let frame_time = match self.previous {
            Some(prev) => now - prev,
            None => 0.0,
        };
        self.previous = Some(now);
        self.step(clock, frame_time, update, render)
    }

    /// Runs one frame with an explicit elapsed time (seconds).
    ///
    /// The update callback runs per the catch-up policy; the render callback
    /// runs exactly once, and its duration (as observed through `clock`) is
    /// recorded as the last render time.
    pub fn step(
        &mut self,
        clock: &dyn Clock,
        frame_time: f64,
        mut update: impl FnMut(),
        mut render: impl FnMut(),
    ) -> u32 {
        self.accumulator += frame_time.max(0.0);

        let mut ran = 0u32;
        match self.policy {
            CatchUpPolicy::Single => {
                if self.accumulator > self.period {
                    update();
                    self.accumulator -= self.period;
                    ran = 1;
                }
            }
            CatchUpPolicy::Capped { max_steps } => {
                let max_steps = max_steps.max(1);
                while self.accumulator >= self.period && ran < max_steps {
                    update();
                    self.accumulator -= self.period;
                    ran += 1;
                }
                if self.accumulator >= self.period {
                    let dropped = (self.accumulator / self.period).floor();
                    warn!(
                        "update backlog {:.1}ms exceeds {} catch-up steps, dropping {} updates",
                        self.accumulator * 1000.0,
                        max_steps,
                        dropped as u64,
                    );
                    self.accumulator -= dropped * self.period;
                }
            }
        }
        self.update_count += u64::from(ran);

        let render_start = clock.now();
        render();
        self.last_render_ms = (clock.now() - render_start) * 1000.0;
        self.frame_count += 1;

        ran
    }

    /// The fixed update period in seconds.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// The catch-up policy in effect.
    pub fn policy(&self) -> CatchUpPolicy {
        self.policy
    }

    /// Accumulated simulation time not yet consumed by updates, in seconds.
    pub fn backlog(&self) -> f64 {
        self.accumulator
    }

    /// Total update invocations so far.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Total frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Duration of the most recent render callback, in milliseconds.
    pub fn last_render_ms(&self) -> f64 {
        self.last_render_ms
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, CatchUpPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn single() -> FrameLoop {
        FrameLoop::new(DEFAULT_PERIOD, CatchUpPolicy::Single)
    }

    fn capped(max_steps: u32) -> FrameLoop {
        FrameLoop::new(DEFAULT_PERIOD, CatchUpPolicy::Capped { max_steps })
    }

    #[test]
    fn test_default_period_is_60hz() {
        let fl = FrameLoop::default();
        assert!((fl.period() - 1.0 / 60.0).abs() < f64::EPSILON * 10.0);
    }

    #[test]
    fn test_from_hz() {
        let fl = FrameLoop::from_hz(120, CatchUpPolicy::Single);
        assert!((fl.period() - 1.0 / 120.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_period_falls_back() {
        let fl = FrameLoop::new(0.0, CatchUpPolicy::Single);
        assert!((fl.period() - DEFAULT_PERIOD).abs() < 1e-12);
    }

    #[test]
    fn test_single_policy_runs_at_most_one_update() {
        let clock = ManualClock::new();
        let mut fl = single();
        let mut updates = 0u32;
        // A burst worth five full periods still yields a single update.
        let ran = fl.step(&clock, 5.0 * DEFAULT_PERIOD, || updates += 1, || {});
        assert_eq!(ran, 1);
        assert_eq!(updates, 1);
        // The unconsumed backlog stays behind: the documented drift.
        assert!(fl.backlog() > 3.9 * DEFAULT_PERIOD);
    }

    #[test]
    fn test_single_policy_drift_accumulates() {
        let clock = ManualClock::new();
        let mut fl = single();
        // Sustained 2x-slow frames: backlog grows by one period per frame.
        for _ in 0..10 {
            fl.step(&clock, 2.0 * DEFAULT_PERIOD, || {}, || {});
        }
        assert_eq!(fl.update_count(), 10);
        assert!(fl.backlog() >= 9.0 * DEFAULT_PERIOD);
    }

    #[test]
    fn test_single_policy_no_update_below_period() {
        let clock = ManualClock::new();
        let mut fl = single();
        let mut updates = 0u32;
        let ran = fl.step(&clock, 0.5 * DEFAULT_PERIOD, || updates += 1, || {});
        assert_eq!(ran, 0);
        assert_eq!(updates, 0);
    }

    #[test]
    fn test_capped_policy_formula() {
        let clock = ManualClock::new();
        // T = 3.5 periods, cap = 8: expect floor(3.5) = 3 updates.
        let mut fl = capped(8);
        let mut updates = 0u32;
        let ran = fl.step(&clock, 3.5 * DEFAULT_PERIOD, || updates += 1, || {});
        assert_eq!(ran, 3);
        assert_eq!(updates, 3);
        // Sub-period remainder is kept for the next frame.
        assert!((fl.backlog() - 0.5 * DEFAULT_PERIOD).abs() < 1e-9);
    }

    #[test]
    fn test_capped_policy_caps_and_drops_backlog() {
        let clock = ManualClock::new();
        // T = 10 periods, cap = 4: 4 updates run, 6 whole periods dropped.
        let mut fl = capped(4);
        let mut updates = 0u32;
        let ran = fl.step(&clock, 10.0 * DEFAULT_PERIOD, || updates += 1, || {});
        assert_eq!(ran, 4);
        assert_eq!(updates, 4);
        assert!(fl.backlog() < DEFAULT_PERIOD);
    }

    #[test]
    fn test_capped_policy_zero_cap_treated_as_one() {
        let clock = ManualClock::new();
        let mut fl = capped(0);
        let ran = fl.step(&clock, 2.0 * DEFAULT_PERIOD, || {}, || {});
        assert_eq!(ran, 1);
    }

    #[test]
    fn test_render_runs_exactly_once_per_frame() {
        let clock = ManualClock::new();
        for policy in [CatchUpPolicy::Single, CatchUpPolicy::Capped { max_steps: 4 }] {
            let mut fl = FrameLoop::new(DEFAULT_PERIOD, policy);
            for frame_time in [0.0, 0.5 * DEFAULT_PERIOD, 7.0 * DEFAULT_PERIOD] {
                let mut renders = 0u32;
                fl.step(&clock, frame_time, || {}, || renders += 1);
                assert_eq!(renders, 1, "policy {policy:?}, frame_time {frame_time}");
            }
            assert_eq!(fl.frame_count(), 3);
        }
    }

    #[test]
    fn test_tick_measures_elapsed_via_clock() {
        let clock = ManualClock::new();
        let mut fl = capped(4);
        let mut updates = 0u32;

        // First tick has no previous timestamp: zero elapsed, no updates.
        let ran = fl.tick(&clock, || updates += 1, || {});
        assert_eq!(ran, 0);

        // Advance exactly two periods; both are consumed.
        clock.advance(2.0 * DEFAULT_PERIOD);
        let ran = fl.tick(&clock, || updates += 1, || {});
        assert_eq!(ran, 2);
        assert_eq!(updates, 2);
        assert_eq!(fl.update_count(), 2);
        assert_eq!(fl.frame_count(), 2);
    }

    #[test]
    fn test_render_duration_recorded() {
        let clock = ManualClock::new();
        let mut fl = capped(4);
        // The render callback "takes" 4ms of manual-clock time.
        fl.step(&clock, 0.0, || {}, || clock.advance(0.004));
        assert!((fl.last_render_ms() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_frame_time_ignored() {
        let clock = ManualClock::new();
        let mut fl = capped(4);
        fl.step(&clock, DEFAULT_PERIOD * 0.5, || {}, || {});
        let backlog = fl.backlog();
        fl.step(&clock, -1.0, || {}, || {});
        assert!((fl.backlog() - backlog).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic_sequence() {
        let clock = ManualClock::new();
        let frame_times = [0.017, 0.015, 0.020, 0.016, 0.033, 0.008, 0.018];

        let mut a = capped(4);
        let mut b = capped(4);
        for &ft in &frame_times {
            a.step(&clock, ft, || {}, || {});
            b.step(&clock, ft, || {}, || {});
        }
        assert_eq!(a.update_count(), b.update_count());
        assert_eq!(a.frame_count(), b.frame_count());
        assert!((a.backlog() - b.backlog()).abs() < 1e-15);
    }

    #[test]
    fn test_burst_of_five_periods_per_policy() {
        // The end-to-end drift property: one burst worth five periods.
        let clock = ManualClock::new();

        let mut updates = 0u32;
        let mut renders = 0u32;
        let mut fl = single();
        fl.step(&clock, 5.0 * DEFAULT_PERIOD, || updates += 1, || renders += 1);
        assert_eq!((updates, renders), (1, 1));

        let mut updates = 0u32;
        let mut renders = 0u32;
        let mut fl = capped(8);
        fl.step(&clock, 5.0 * DEFAULT_PERIOD, || updates += 1, || renders += 1);
        assert_eq!((updates, renders), (5, 1));
    }
}
