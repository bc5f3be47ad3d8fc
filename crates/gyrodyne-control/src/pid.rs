//! PI and PID rate controllers with layered anti-windup.
//!
//! The integral path is clamped three ways: errors larger than
//! `integral_clamp` do not accumulate at all (no windup while actively
//! diverging), the accumulator's per-tick change is bounded by
//! `accumulator_deriv_clamp * dt`, and the accumulator magnitude is bounded
//! by `accumulator_clamp`.  A timestep discontinuity resynchronizes the
//! stored error instead of integrating across a suspect interval.

use gyrodyne_core::config::ControllerConfig;

/// Relative dt change treated as a timestep discontinuity.
pub const DT_TOLERANCE: f64 = 0.1;

/// Symmetric magnitude clamp. `limit` is assumed non-negative.
fn clamp_magnitude(value: f64, limit: f64) -> f64 {
    value.clamp(-limit, limit)
}

// ---------------------------------------------------------------------------
// PiController
// ---------------------------------------------------------------------------

/// Proportional-integral controller over `(input, desired, dt)`.
///
/// Output is unclamped; callers clamp to their command range.
#[derive(Debug, Clone)]
pub struct PiController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain, applied to the accumulator.
    pub ki: f64,
    /// Gain on the raw trapezoidal increment before clamping.
    pub integral_gain: f64,
    /// Largest error magnitude still fed to the accumulator.
    pub integral_clamp: f64,
    /// Clamp on the accumulator's rate of change, per second.
    pub accumulator_deriv_clamp: f64,
    /// Magnitude clamp on the accumulator.
    pub accumulator_clamp: f64,

    accumulator: f64,
    last_error: f64,
    last_dt: f64,
}

impl PiController {
    /// Create a controller with the given proportional and integral gains
    /// and neutral clamps.
    pub const fn new(kp: f64, ki: f64) -> Self {
        Self {
            kp,
            ki,
            integral_gain: 1.0,
            integral_clamp: 1.0,
            accumulator_deriv_clamp: 1.0,
            accumulator_clamp: 0.1,
            accumulator: 0.0,
            last_error: 0.0,
            // Neutral value; the first control() call reads as a dt
            // discontinuity and resynchronizes.
            last_dt: 1.0,
        }
    }

    /// Create a controller from configuration gains. `kd` is ignored.
    pub const fn from_config(config: &ControllerConfig) -> Self {
        Self {
            kp: config.kp,
            ki: config.ki,
            integral_gain: config.integral_gain,
            integral_clamp: config.integral_clamp,
            accumulator_deriv_clamp: config.accumulator_deriv_clamp,
            accumulator_clamp: config.accumulator_clamp,
            accumulator: 0.0,
            last_error: 0.0,
            last_dt: 1.0,
        }
    }

    /// Compute the control output for one tick.
    ///
    /// `error = desired - input`. On a timestep discontinuity the stored
    /// error is resynchronized to the current one, so neither the integral
    /// nor any derivative layered on top integrates across the jump.
    pub fn control(&mut self, input: f64, desired: f64, dt: f64) -> f64 {
        let error = desired - input;

        let proportional = error * self.kp;

        if !self.dt_is_stable(dt) {
            self.last_error = error;
        }

        if self.ki != 0.0 {
            let raw = if error.abs() > self.integral_clamp {
                0.0
            } else {
                0.5 * dt * (error + self.last_error)
            };
            let increment = clamp_magnitude(
                self.integral_gain * raw,
                self.accumulator_deriv_clamp * dt,
            );
            self.accumulator =
                clamp_magnitude(self.accumulator + increment, self.accumulator_clamp);
        }
        let integral = self.accumulator * self.ki;

        self.last_dt = dt;
        self.last_error = error;

        proportional + integral
    }

    /// Reset the accumulator without touching gains or clamps.
    ///
    /// Called on mode exits, e.g. when the pilot takes manual control.
    pub const fn clear(&mut self) {
        self.accumulator = 0.0;
    }

    /// Current accumulator value.
    pub const fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Error seen on the previous tick.
    pub const fn last_error(&self) -> f64 {
        self.last_error
    }

    fn dt_is_stable(&self, dt: f64) -> bool {
        (dt / self.last_dt - 1.0).abs() < DT_TOLERANCE
    }
}

// ---------------------------------------------------------------------------
// PidController
// ---------------------------------------------------------------------------

/// PI controller with an additional derivative-of-error term.
///
/// The derivative contribution is zero on the first call and after any
/// timestep discontinuity, since the stored error is resynchronized before
/// differencing.
#[derive(Debug, Clone)]
pub struct PidController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain, applied to the accumulator.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Gain on the raw trapezoidal increment before clamping.
    pub integral_gain: f64,
    /// Largest error magnitude still fed to the accumulator.
    pub integral_clamp: f64,
    /// Clamp on the accumulator's rate of change, per second.
    pub accumulator_deriv_clamp: f64,
    /// Magnitude clamp on the accumulator.
    pub accumulator_clamp: f64,

    accumulator: f64,
    last_error: f64,
    last_dt: f64,
}

impl PidController {
    /// Create a controller with the given gains and neutral clamps.
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_gain: 1.0,
            integral_clamp: 1.0,
            accumulator_deriv_clamp: 1.0,
            accumulator_clamp: 0.1,
            accumulator: 0.0,
            last_error: 0.0,
            last_dt: 1.0,
        }
    }

    /// Create a controller from configuration gains.
    pub const fn from_config(config: &ControllerConfig) -> Self {
        Self {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            integral_gain: config.integral_gain,
            integral_clamp: config.integral_clamp,
            accumulator_deriv_clamp: config.accumulator_deriv_clamp,
            accumulator_clamp: config.accumulator_clamp,
            accumulator: 0.0,
            last_error: 0.0,
            last_dt: 1.0,
        }
    }

    /// Compute the control output for one tick.
    pub fn control(&mut self, input: f64, desired: f64, dt: f64) -> f64 {
        let error = desired - input;

        let proportional = error * self.kp;

        if !self.dt_is_stable(dt) {
            self.last_error = error;
        }

        let derivative = self.kd * (error - self.last_error) / dt;

        if self.ki != 0.0 {
            let raw = if error.abs() > self.integral_clamp {
                0.0
            } else {
                0.5 * dt * (error + self.last_error)
            };
            let increment = clamp_magnitude(
                self.integral_gain * raw,
                self.accumulator_deriv_clamp * dt,
            );
            self.accumulator =
                clamp_magnitude(self.accumulator + increment, self.accumulator_clamp);
        }
        let integral = self.accumulator * self.ki;

        self.last_dt = dt;
        self.last_error = error;

        proportional + integral + derivative
    }

    /// Reset the accumulator without touching gains or clamps.
    pub const fn clear(&mut self) {
        self.accumulator = 0.0;
    }

    /// Current accumulator value.
    pub const fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Error seen on the previous tick.
    pub const fn last_error(&self) -> f64 {
        self.last_error
    }

    fn dt_is_stable(&self, dt: f64) -> bool {
        (dt / self.last_dt - 1.0).abs() < DT_TOLERANCE
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
