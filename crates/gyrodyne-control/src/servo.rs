//! Actuator deflection-lag models.
//!
//! A control surface does not jump to its commanded deflection; it tracks
//! toward it at a finite rate.  Two interchangeable policies model that lag,
//! both pure functions of `(previous, desired, dt, parameters)` so the host
//! picks one through configuration rather than an internal branch.

use gyrodyne_core::config::{ActuatorConfig, LagPolicyKind};

/// Fraction of the remaining error an exponential-blend step may close in a
/// single tick.
const MAX_BLEND_STEP_FRACTION: f64 = 0.6;

/// Error scale below which the exponential blend snaps to the command.
const COLLAPSE_THRESHOLD: f64 = 0.1;

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Move `previous` toward `desired` by at most `max_rate * dt`.
pub fn rate_limited(previous: f64, desired: f64, dt: f64, max_rate: f64) -> f64 {
    let max_delta = max_rate * dt;
    previous + (desired - previous).clamp(-max_delta, max_delta)
}

/// Returns `true` when `previous` and `desired` are close enough that the
/// exponential blend snaps to the command outright.
///
/// Without the snap, the first-order step leaves a perpetually shrinking
/// residual that keeps the surface twitching around the command.
pub fn blend_collapses(previous: f64, desired: f64) -> bool {
    ((desired - previous) * 10.0).abs() < COLLAPSE_THRESHOLD
}

/// First-order exponential blend toward `desired` with time constant `tau`.
///
/// Steps by `error * dt / tau`, bounded to 60% of the remaining error per
/// tick; within the collapse threshold the output equals `desired` exactly.
pub fn exponential_blend(previous: f64, desired: f64, dt: f64, tau: f64) -> f64 {
    let error = desired - previous;
    if blend_collapses(previous, desired) {
        desired
    } else {
        let limit = MAX_BLEND_STEP_FRACTION * error.abs();
        previous + (error * dt / tau).clamp(-limit, limit)
    }
}

// ---------------------------------------------------------------------------
// LagPolicy
// ---------------------------------------------------------------------------

/// Configured deflection-lag policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LagPolicy {
    /// Bounded deflection rate in command units per second.
    RateLimited {
        /// Maximum deflection rate.
        max_rate: f64,
    },
    /// Exponential blend with the given time constant in seconds.
    Exponential {
        /// Blend time constant.
        tau: f64,
    },
}

impl LagPolicy {
    /// Build the policy selected by an [`ActuatorConfig`].
    pub const fn from_config(config: &ActuatorConfig) -> Self {
        match config.policy {
            LagPolicyKind::RateLimited => Self::RateLimited {
                max_rate: config.max_deflection_rate,
            },
            LagPolicyKind::Exponential => Self::Exponential {
                tau: config.blend_time_constant,
            },
        }
    }

    /// The deflection an actual surface reaches after one tick of lag.
    pub fn apply(&self, previous: f64, desired: f64, dt: f64) -> f64 {
        match *self {
            Self::RateLimited { max_rate } => rate_limited(previous, desired, dt, max_rate),
            Self::Exponential { tau } => exponential_blend(previous, desired, dt, tau),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
