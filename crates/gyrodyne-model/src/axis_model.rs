//! Per-axis short-motion model: sample histories and online identification
//! of control authority.
//!
//! The model assumes a local linear relationship
//! `Δ(angular acceleration) ≈ k · Δ(control input)` and identifies `k` from
//! flight data. Each tick it extrapolates what the smoothed acceleration
//! *would have been* absent any control change (a second-order Taylor step
//! over the smoothed history) and attributes the surplus to the input change
//! a few ticks back — the lag matches both the actuator response delay and
//! the effective center of the smoothing kernel.

use gyrodyne_core::buffer::CircularBuffer;
use gyrodyne_core::config::ModelConfig;

use crate::diff;

/// Authority reported before any sample has ever been accepted: downstream
/// control math degrades to an unscaled response instead of dividing by
/// nothing.
pub const NEUTRAL_AUTHORITY: f64 = 1.0;

/// Raw authority estimate from a smoothed-acceleration history.
///
/// Extrapolates the pre-change trend from samples 1..=3 ticks back and
/// divides the newest sample's surplus by the control change. Requires at
/// least 4 buffered samples; gates on magnitude or sign are the caller's.
pub fn authority_from_history(smooth_accel: &CircularBuffer<f64>, d_control: f64, dt: f64) -> f64 {
    let d1 = diff::short_derivative(smooth_accel.from_tail(2), smooth_accel.from_tail(1), dt);
    let d2 = diff::second_derivative(
        smooth_accel.from_tail(3),
        smooth_accel.from_tail(2),
        smooth_accel.from_tail(1),
        dt,
    );
    let expected = diff::extrapolate(smooth_accel.from_tail(1), d1, d2, dt);
    (smooth_accel.from_tail(0) - expected) / d_control
}

// ---------------------------------------------------------------------------
// AxisControlModel
// ---------------------------------------------------------------------------

/// Sample histories and identification state for one rotation axis.
///
/// Mutated every tick by the owning vehicle model; never reset wholesale.
/// A timestep discontinuity clears only the derivative histories — the raw
/// velocity and input samples remain valid observations.
#[derive(Debug, Clone)]
pub struct AxisControlModel {
    input: CircularBuffer<f64>,
    actuated: CircularBuffer<f64>,
    angular_velocity: CircularBuffer<f64>,
    short_accel: CircularBuffer<f64>,
    smooth_accel: CircularBuffer<f64>,
    authority: CircularBuffer<f64>,
    mistake: CircularBuffer<f64>,
    angle_of_attack: CircularBuffer<f64>,
    statically_stable: bool,
}

impl AxisControlModel {
    /// Create a model whose histories hold `capacity` samples each.
    pub fn new(capacity: usize) -> Self {
        Self {
            input: CircularBuffer::with_capacity(capacity),
            actuated: CircularBuffer::with_capacity(capacity),
            angular_velocity: CircularBuffer::with_capacity(capacity),
            short_accel: CircularBuffer::with_capacity(capacity),
            smooth_accel: CircularBuffer::with_capacity(capacity),
            authority: CircularBuffer::with_capacity(capacity),
            mistake: CircularBuffer::with_capacity(capacity),
            angle_of_attack: CircularBuffer::with_capacity(capacity),
            statically_stable: false,
        }
    }

    // -- per-tick recording, called by the vehicle model --

    pub(crate) fn record_velocity(&mut self, rate: f64) {
        self.angular_velocity.push(rate);
    }

    /// Push the short and smoothed derivative of the velocity history.
    ///
    /// Caller gates: requires 7 stable-dt velocity samples.
    pub(crate) fn update_derivatives(&mut self, dt: f64) {
        self.short_accel.push(diff::short_derivative(
            self.angular_velocity.from_tail(1),
            self.angular_velocity.from_tail(0),
            dt,
        ));
        self.smooth_accel
            .push(diff::smooth_central(&self.angular_velocity, dt));
    }

    pub(crate) fn record_input(&mut self, raw: f64) {
        self.input.push(raw);
    }

    pub(crate) fn record_actuated(&mut self, value: f64) {
        self.actuated.push(value);
    }

    pub(crate) fn record_angle_of_attack(&mut self, aoa: f64) {
        self.angle_of_attack.push(aoa);
    }

    /// One identification step over the current histories.
    ///
    /// Caller gates on the stability counter; the length gates here protect
    /// the window reads while histories are still filling.
    pub(crate) fn identify(&mut self, dt: f64, config: &ModelConfig) {
        let lag = config.input_lag_ticks;
        if self.smooth_accel.len() >= 4 && self.input.len() > lag + 1 {
            let d_control = self.input.from_tail(lag) - self.input.from_tail(lag + 1);
            // A change too small to rise above noise identifies nothing and
            // would amplify whatever it divides into.
            if d_control.abs() > config.significance_threshold {
                let estimate = authority_from_history(&self.smooth_accel, d_control, dt);
                if estimate > config.min_authority {
                    self.authority.push(estimate);
                }
            }
        }

        if self.short_accel.len() >= 3 {
            let trend = diff::short_derivative(
                self.short_accel.from_tail(2),
                self.short_accel.from_tail(1),
                dt,
            );
            // Statically stable: the acceleration is decaying toward zero
            // on its own.
            self.statically_stable = self.short_accel.from_tail(2) * trend < 0.0;
        }

        if !self.smooth_accel.is_empty() && self.short_accel.len() >= 4 {
            self.mistake.push(
                (self.smooth_accel.from_tail(0) - self.short_accel.from_tail(3)).abs(),
            );
        }
    }

    /// Drop derivative-based history after a timestep discontinuity.
    ///
    /// The raw velocity and input samples stay: they are valid observations,
    /// it is only their differences across the jump that would lie.
    pub(crate) fn invalidate_derivatives(&mut self) {
        self.short_accel.clear();
        self.smooth_accel.clear();
    }

    // -- queries --

    /// Rolling-average control authority, or [`NEUTRAL_AUTHORITY`] when no
    /// sample has ever been accepted.
    pub fn authority(&self) -> f64 {
        if self.authority.is_empty() {
            NEUTRAL_AUTHORITY
        } else {
            self.authority.average()
        }
    }

    /// Most recently accepted authority sample, or [`NEUTRAL_AUTHORITY`].
    pub fn authority_instant(&self) -> f64 {
        self.authority.last().unwrap_or(NEUTRAL_AUTHORITY)
    }

    /// Number of accepted authority samples in the rolling window.
    pub fn authority_sample_count(&self) -> usize {
        self.authority.len()
    }

    /// Latest model-quality diagnostic: the absolute gap between the
    /// smoothed and the low-latency acceleration estimates.
    pub fn mistake(&self) -> Option<f64> {
        self.mistake.last()
    }

    /// Input change needed to shift the angular acceleration by
    /// `desired_accel_change`, by inverting the identified model.
    pub fn input_delta_for(&self, desired_accel_change: f64) -> f64 {
        desired_accel_change / self.authority()
    }

    /// Whether the axis is statically stable (acceleration decaying toward
    /// zero without control action).
    pub fn statically_stable(&self) -> bool {
        self.statically_stable
    }

    /// Latest recorded angular velocity sample.
    pub fn angular_velocity(&self) -> Option<f64> {
        self.angular_velocity.last()
    }

    /// Latest low-latency acceleration estimate.
    pub fn acceleration(&self) -> Option<f64> {
        self.short_accel.last()
    }

    /// Latest smoothed acceleration estimate.
    pub fn smoothed_acceleration(&self) -> Option<f64> {
        self.smooth_accel.last()
    }

    /// Latest actuated (post-lag) control value.
    pub fn actuated(&self) -> Option<f64> {
        self.actuated.last()
    }

    /// Latest raw commanded control value.
    pub fn input(&self) -> Option<f64> {
        self.input.last()
    }

    /// Latest angle-of-attack sample, radians.
    pub fn angle_of_attack(&self) -> Option<f64> {
        self.angle_of_attack.last()
    }

    /// Number of velocity samples currently buffered.
    pub fn velocity_sample_count(&self) -> usize {
        self.angular_velocity.len()
    }

    /// Number of smoothed-acceleration samples currently buffered.
    pub fn smoothed_sample_count(&self) -> usize {
        self.smooth_accel.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
