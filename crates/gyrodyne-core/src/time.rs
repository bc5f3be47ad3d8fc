//! Physics timestep stability tracking.
//!
//! Every derivative-based stage in the pipeline assumes equally spaced
//! samples. Time-warp changes, scene reloads, and physics hiccups violate
//! that assumption, so the tracker counts consecutive ticks whose timestep
//! stayed within tolerance of the previous one. Stages gate on the counter
//! before trusting their sample windows.

/// Upper bound on the stable-tick counter so it cannot overflow on
/// long flights.
pub const STABLE_TICK_CAP: u32 = 1000;

/// Default relative tolerance for calling two timesteps "the same".
pub const DEFAULT_TOLERANCE: f64 = 0.1;

// ---------------------------------------------------------------------------
// TimestepTracker
// ---------------------------------------------------------------------------

/// Tracks the last observed timestep and the length of the current stable run.
///
/// A new dt is stable iff `|dt / last_dt - 1| < tolerance`. Any unstable
/// tick resets the run to zero; dependent state (derivative histories,
/// identification samples) must be invalidated by the owner when that
/// happens.
#[derive(Debug, Clone)]
pub struct TimestepTracker {
    last_dt: f64,
    stable_ticks: u32,
    tolerance: f64,
}

impl Default for TimestepTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl TimestepTracker {
    /// Create a tracker with the given relative tolerance fraction.
    pub const fn new(tolerance: f64) -> Self {
        Self {
            // Neutral starting value; the first real dt will compare against
            // this and read as a discontinuity, which is the safe default.
            last_dt: 1.0,
            stable_ticks: 0,
            tolerance,
        }
    }

    /// Observe the timestep of the current tick.
    ///
    /// Returns `true` when the tick extended the stable run, `false` when it
    /// reset it.
    pub fn observe(&mut self, dt: f64) -> bool {
        let stable = (dt / self.last_dt - 1.0).abs() < self.tolerance;
        self.stable_ticks = if stable {
            (self.stable_ticks + 1).min(STABLE_TICK_CAP)
        } else {
            0
        };
        self.last_dt = dt;
        stable
    }

    /// Length of the current stable run, capped at [`STABLE_TICK_CAP`].
    pub const fn stable_ticks(&self) -> u32 {
        self.stable_ticks
    }

    /// Returns `true` when the timestep has been stable for at least
    /// `ticks` consecutive ticks.
    pub const fn is_stable_for(&self, ticks: u32) -> bool {
        self.stable_ticks >= ticks
    }

    /// The most recently observed timestep in seconds.
    pub const fn last_dt(&self) -> f64 {
        self.last_dt
    }

    /// Force the stable run back to zero without touching the last dt.
    ///
    /// Used when an external event (ground contact, vehicle break-up)
    /// invalidates the model even though the clock itself did not jump.
    pub const fn reset(&mut self) {
        self.stable_ticks = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_is_a_discontinuity() {
        let mut t = TimestepTracker::default();
        assert!(!t.observe(0.02));
        assert_eq!(t.stable_ticks(), 0);
    }

    #[test]
    fn stable_run_counts_up() {
        let mut t = TimestepTracker::default();
        t.observe(0.02);
        for i in 1..=5 {
            assert!(t.observe(0.02));
            assert_eq!(t.stable_ticks(), i);
        }
        assert!(t.is_stable_for(5));
        assert!(!t.is_stable_for(6));
    }

    #[test]
    fn within_tolerance_counts_as_stable() {
        let mut t = TimestepTracker::default();
        t.observe(0.02);
        // 5% change, under the 10% default tolerance.
        assert!(t.observe(0.021));
    }

    #[test]
    fn jump_resets_counter() {
        let mut t = TimestepTracker::default();
        t.observe(0.02);
        for _ in 0..10 {
            t.observe(0.02);
        }
        assert!(t.is_stable_for(7));
        assert!(!t.observe(0.5));
        assert_eq!(t.stable_ticks(), 0);
        assert!((t.last_dt() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn recovery_after_jump_needs_full_run() {
        let mut t = TimestepTracker::default();
        for _ in 0..10 {
            t.observe(0.02);
        }
        t.observe(0.5);
        t.observe(0.02); // also unstable relative to 0.5
        assert_eq!(t.stable_ticks(), 0);
        for i in 1..=7 {
            t.observe(0.02);
            assert_eq!(t.stable_ticks(), i);
        }
    }

    #[test]
    fn counter_is_capped() {
        let mut t = TimestepTracker::default();
        t.observe(0.02);
        for _ in 0..(STABLE_TICK_CAP + 50) {
            t.observe(0.02);
        }
        assert_eq!(t.stable_ticks(), STABLE_TICK_CAP);
    }

    #[test]
    fn reset_zeroes_run_keeps_dt() {
        let mut t = TimestepTracker::default();
        for _ in 0..5 {
            t.observe(0.02);
        }
        t.reset();
        assert_eq!(t.stable_ticks(), 0);
        assert!((t.last_dt() - 0.02).abs() < f64::EPSILON);
        // The dt itself is unchanged, so the next tick is stable again.
        assert!(t.observe(0.02));
    }
}
