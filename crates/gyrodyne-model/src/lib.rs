//! Rotational-dynamics estimation for the gyrodyne attitude stack.
//!
//! Consumes an immutable [`VehicleSnapshot`](gyrodyne_core::snapshot::VehicleSnapshot)
//! once per physics tick and maintains, per vehicle:
//!
//! - a rigid-body aggregate (mass, center of mass, inertia, angular momentum,
//!   angular velocity) with a cheap partial pass between periodic full passes;
//! - noise-robust derivative estimates of the rotation rates;
//! - an online per-axis linear model `Δ(angular acceleration) ≈ k · Δ(input)`
//!   identified from flight data with no prior knowledge of the vehicle.
//!
//! Everything runs synchronously inside the tick callback; no stage blocks,
//! allocates on the hot path beyond the snapshot itself, or suspends.

pub mod axis_model;
pub mod diff;
pub mod rigid_body;
pub mod vehicle;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::axis_model::{AxisControlModel, authority_from_history};
    pub use crate::rigid_body::{MassivePart, RigidBodyEstimator, RigidBodyState};
    pub use crate::vehicle::VehicleModel;
}
