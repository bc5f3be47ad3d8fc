//! Finite-difference derivative kernels.
//!
//! Physics samples arrive noisy, so besides the usual short differences the
//! module provides two 7-point smoothing differentiators (Holoborodko's
//! noise-robust kernels): a one-sided *hybrid* kernel usable with trailing
//! history only, and a *central* kernel whose estimate is effectively
//! centered three samples back — which is exactly the lag the authority
//! identifier aligns control inputs against.
//!
//! All kernels assume equally spaced samples; callers gate on the timestep
//! stability counter before invoking them.

use gyrodyne_core::buffer::CircularBuffer;

/// Two-point backward difference.
pub fn short_derivative(y0: f64, y1: f64, dt: f64) -> f64 {
    (y1 - y0) / dt
}

/// Midpoint difference over a two-step span.
pub fn midpoint_derivative(y0: f64, y2: f64, dt: f64) -> f64 {
    (y2 - y0) / dt * 0.5
}

/// Three-point one-sided first derivative at the newest sample.
pub fn backward_derivative(y0: f64, y1: f64, y2: f64, dt: f64) -> f64 {
    (y0 - 4.0 * y1 + 3.0 * y2) / dt * 0.5
}

/// Three-point second derivative.
pub fn second_derivative(y0: f64, y1: f64, y2: f64, dt: f64) -> f64 {
    (y0 - 2.0 * y1 + y2) / dt / dt
}

/// Second-order Taylor step: the value one `dt` past `y` given first and
/// second derivatives at `y`.
pub fn extrapolate(y: f64, d1: f64, d2: f64, dt: f64) -> f64 {
    y + d1 * dt + 0.5 * d2 * dt * dt
}

/// Hybrid noise-robust kernel weights, oldest sample first.
const HYBRID_WEIGHTS: [f64; 7] = [6.0, 1.0, -10.0, -6.0, -8.0, 5.0, 12.0];
const HYBRID_NORM: f64 = 28.0;

/// Central noise-robust kernel weights, oldest sample first.
const CENTRAL_WEIGHTS: [f64; 7] = [-1.0, -4.0, -5.0, 0.0, 5.0, 4.0, 1.0];
const CENTRAL_NORM: f64 = 32.0;

/// One-sided smooth noise-robust differentiator over the 7 newest samples.
///
/// Requires at least 7 buffered samples ([`from_tail`](CircularBuffer::from_tail)
/// panics otherwise) with stable spacing `dt`.
pub fn smooth_hybrid(samples: &CircularBuffer<f64>, dt: f64) -> f64 {
    weighted_tail_sum(samples, &HYBRID_WEIGHTS) / (HYBRID_NORM * dt)
}

/// Central smooth noise-robust differentiator over the 7 newest samples.
///
/// The estimate is centered on the sample three ticks back. Requires at
/// least 7 buffered samples with stable spacing `dt`.
pub fn smooth_central(samples: &CircularBuffer<f64>, dt: f64) -> f64 {
    weighted_tail_sum(samples, &CENTRAL_WEIGHTS) / (CENTRAL_NORM * dt)
}

fn weighted_tail_sum(samples: &CircularBuffer<f64>, weights: &[f64; 7]) -> f64 {
    let mut sum = 0.0;
    for (i, weight) in weights.iter().enumerate() {
        sum += weight * samples.from_tail(6 - i);
    }
    sum
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_of(values: &[f64]) -> CircularBuffer<f64> {
        let mut buf = CircularBuffer::with_capacity(values.len().max(7));
        for &v in values {
            buf.push(v);
        }
        buf
    }

    // ---- short kernels ----

    #[test]
    fn short_derivative_slope() {
        assert!((short_derivative(1.0, 2.0, 0.5) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn midpoint_derivative_slope() {
        // Samples one slope unit apart over two steps of dt = 1.
        assert!((midpoint_derivative(0.0, 4.0, 1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn backward_derivative_exact_on_quadratic() {
        // y = t^2 at t = 0, 1, 2: derivative at t = 2 is 4.
        assert!((backward_derivative(0.0, 1.0, 4.0, 1.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn second_derivative_exact_on_quadratic() {
        // y = t^2: second derivative 2 everywhere.
        assert!((second_derivative(0.0, 1.0, 4.0, 1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn extrapolate_reconstructs_quadratic() {
        // y = t^2 at t = 2 with y' = 4, y'' = 2: predicts 9 at t = 3.
        assert!((extrapolate(4.0, 4.0, 2.0, 1.0) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn extrapolate_constant_is_identity() {
        assert!((extrapolate(3.5, 0.0, 0.0, 0.02) - 3.5).abs() < f64::EPSILON);
    }

    // ---- smoothing kernels ----

    #[test]
    fn hybrid_exact_on_linear_sequence() {
        let buf = buffer_of(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!((smooth_hybrid(&buf, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn central_exact_on_linear_sequence() {
        let buf = buffer_of(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!((smooth_central(&buf, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn kernels_scale_with_dt() {
        let buf = buffer_of(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        // Same samples at half the spacing: twice the slope.
        assert!((smooth_hybrid(&buf, 0.5) - 2.0).abs() < 1e-12);
        assert!((smooth_central(&buf, 0.5) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn kernels_zero_on_constant_sequence() {
        let buf = buffer_of(&[2.5; 7]);
        assert!(smooth_hybrid(&buf, 0.02).abs() < 1e-12);
        assert!(smooth_central(&buf, 0.02).abs() < 1e-12);
    }

    #[test]
    fn central_exact_on_quadratic_at_window_center() {
        // y = t^2 for t = 0..=6: the central kernel reports the derivative
        // at the window center t = 3, which is 6.
        let buf = buffer_of(&[0.0, 1.0, 4.0, 9.0, 16.0, 25.0, 36.0]);
        assert!((smooth_central(&buf, 1.0) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn kernels_use_newest_window_after_wrap() {
        let mut buf = CircularBuffer::with_capacity(7);
        for v in [9.0, 9.0, 9.0] {
            buf.push(v);
        }
        for v in [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            buf.push(v);
        }
        assert!((smooth_central(&buf, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn central_rejects_alternating_noise_better_than_short() {
        // Linear trend plus alternating-sign noise: the central kernel's
        // error should be well under the two-point difference's.
        let noisy: Vec<f64> = (0..7)
            .map(|i| f64::from(i) + if i % 2 == 0 { 0.05 } else { -0.05 })
            .collect();
        let buf = buffer_of(&noisy);
        let smooth_err = (smooth_central(&buf, 1.0) - 1.0).abs();
        let short_err = (short_derivative(buf.from_tail(1), buf.from_tail(0), 1.0) - 1.0).abs();
        assert!(smooth_err < short_err / 2.0, "{smooth_err} vs {short_err}");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn smoothing_below_seven_samples_is_a_contract_violation() {
        let buf = buffer_of(&[0.0, 1.0, 2.0]);
        let _ = smooth_central(&buf, 1.0);
    }
}
