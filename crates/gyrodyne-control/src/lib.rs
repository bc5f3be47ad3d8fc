//! Rate controllers and actuator models for the gyrodyne attitude stack.
//!
//! Pure Rust library with no host dependencies.  Controllers are implemented
//! in-house for full control over the anti-windup behavior; nothing here
//! performs I/O or suspends, so every function is safe to call from a
//! fixed-timestep physics callback.
//!
//! # Control pipeline
//!
//! ```text
//! desired rate → PI/PID → input delta → Actuator Lag → control surface
//!                (anti-windup)           (deflection rate)
//! ```

pub mod damper;
pub mod pid;
pub mod servo;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::damper::RateDamper;
    pub use crate::pid::{PiController, PidController};
    pub use crate::servo::{LagPolicy, blend_collapses, exponential_blend, rate_limited};
}
