//! Rigid-body aggregation over a vehicle's parts.
//!
//! Folds the per-part state of a [`VehicleSnapshot`] into one composite
//! body: total mass, center of mass, diagonal-approximated inertia tensor,
//! angular momentum, and angular velocity, all expressed in the controlling
//! part's frame.
//!
//! Iterating every part each physics tick is too expensive, so a full pass
//! runs only every `full_pass_interval` ticks; the ticks between run a
//! partial pass over a cached set of the most massive parts, recentered on
//! that subset's own center of mass. The recentering biases the estimate
//! for vehicles with many light, long-moment-arm parts; that bias is an
//! accepted trade for the cheaper pass.

use std::collections::HashMap;

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use gyrodyne_core::config::ModelConfig;
use gyrodyne_core::snapshot::{PartId, PartSnapshot, VehicleSnapshot};

/// Inertia components smaller than this divide to zero instead of blowing
/// up the angular-velocity estimate.
const INERTIA_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// RigidBodyState
// ---------------------------------------------------------------------------

/// Composite rigid-body state of a vehicle, in the reference-part frame.
///
/// Owned by the estimator; consumers receive read-only borrows.
#[derive(Debug, Clone)]
pub struct RigidBodyState {
    /// Total mass in tonnes, from the last full pass.
    pub mass: f64,
    /// World-space center of mass, updated every tick.
    pub center_of_mass: Vector3<f64>,
    /// Inertia tensor diagonal in the reference frame, from the last full
    /// pass. Positive semi-definite by construction.
    pub inertia: Vector3<f64>,
    /// Angular momentum in the reference frame, from the last full pass.
    pub angular_momentum: Vector3<f64>,
    /// Inertial angular velocity in the reference frame (host-frame
    /// rotation folded out), updated every tick.
    pub angular_velocity: Vector3<f64>,
    /// Net world-space velocity of the composite body, updated every tick.
    pub world_velocity: Vector3<f64>,
    /// Summed torque of active reaction wheels (pitch, roll, yaw), from the
    /// last full pass.
    pub reaction_torque: Vector3<f64>,
    /// Reference-part rotation the state is expressed against.
    pub reference_rotation: UnitQuaternion<f64>,
}

impl Default for RigidBodyState {
    fn default() -> Self {
        Self {
            mass: 0.0,
            center_of_mass: Vector3::zeros(),
            inertia: Vector3::zeros(),
            angular_momentum: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            world_velocity: Vector3::zeros(),
            reaction_torque: Vector3::zeros(),
            reference_rotation: UnitQuaternion::identity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Component-wise division with a near-zero-denominator guard: components
/// with negligible inertia contribute zero rate rather than infinity.
pub fn component_divide(numerator: Vector3<f64>, denominator: Vector3<f64>) -> Vector3<f64> {
    Vector3::from_fn(|i, _| {
        if denominator[i].abs() < INERTIA_EPSILON {
            0.0
        } else {
            numerator[i] / denominator[i]
        }
    })
}

/// Diagonal of `R * diag(inertia) * R^T`.
///
/// Off-diagonal terms are dropped; the composite tensor stays a diagonal
/// approximation in the reference frame.
pub fn rotated_inertia_diagonal(
    inertia: Vector3<f64>,
    rotation: &UnitQuaternion<f64>,
) -> Vector3<f64> {
    let r = rotation.to_rotation_matrix();
    let full = r * Matrix3::from_diagonal(&inertia) * r.transpose();
    Vector3::new(full[(0, 0)], full[(1, 1)], full[(2, 2)])
}

// ---------------------------------------------------------------------------
// RigidBodyEstimator
// ---------------------------------------------------------------------------

/// Entry in the most-massive-parts cache used by the partial pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassivePart {
    /// Host identity of the cached part.
    pub id: PartId,
    /// Mass at the time of the last full pass.
    pub mass: f64,
}

/// Per-vehicle rigid-body aggregator.
#[derive(Debug, Clone)]
pub struct RigidBodyEstimator {
    state: RigidBodyState,
    massive_parts: Vec<MassivePart>,
    max_tracked_parts: usize,
    full_pass_interval: u32,
    cycle_counter: u32,
    prev_part_count: usize,
    last_pass_full: bool,
}

impl RigidBodyEstimator {
    /// Create an estimator with the given pass cadence and cache size.
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            state: RigidBodyState::default(),
            massive_parts: Vec::with_capacity(config.max_tracked_parts),
            max_tracked_parts: config.max_tracked_parts,
            full_pass_interval: config.full_pass_interval,
            cycle_counter: 0,
            prev_part_count: 0,
            last_pass_full: false,
        }
    }

    /// Current composite state. Read-only.
    pub const fn state(&self) -> &RigidBodyState {
        &self.state
    }

    /// The most-massive-parts cache, sorted descending by mass.
    pub fn tracked_parts(&self) -> &[MassivePart] {
        &self.massive_parts
    }

    /// Whether the most recent [`update`](Self::update) ran a full pass.
    pub const fn last_pass_was_full(&self) -> bool {
        self.last_pass_full
    }

    /// Force the next update to run a full pass.
    pub const fn force_full_pass(&mut self) {
        self.cycle_counter = 0;
    }

    /// Aggregate one tick's snapshot.
    ///
    /// Runs a full pass when the cycle counter has wrapped (or a structural
    /// change was detected), a partial pass over the cached massive parts
    /// otherwise.
    pub fn update(&mut self, snapshot: &VehicleSnapshot) {
        if snapshot.parts.len() != self.prev_part_count {
            self.cycle_counter = 0;
        }
        self.prev_part_count = snapshot.parts.len();

        let full = self.cycle_counter == 0;
        let stale = self.aggregate(snapshot, full);
        self.last_pass_full = full;

        self.cycle_counter = (self.cycle_counter + 1) % self.full_pass_interval;
        if stale {
            // A cached part died or left the vehicle: the structure we
            // aggregated no longer exists, so the next pass must be full.
            self.cycle_counter = 0;
        }
    }

    fn aggregate(&mut self, snapshot: &VehicleSnapshot, all_parts: bool) -> bool {
        let mut stale = false;
        let reference = snapshot.reference_rotation;
        let world_to_ref = reference.inverse();

        let selected: Vec<&PartSnapshot> = if all_parts {
            snapshot.parts.iter().collect()
        } else {
            let by_id: HashMap<PartId, &PartSnapshot> =
                snapshot.parts.iter().map(|p| (p.id, p)).collect();
            let mut live = Vec::with_capacity(self.massive_parts.len());
            for cached in &self.massive_parts {
                match by_id.get(&cached.id) {
                    Some(part) => live.push(*part),
                    None => stale = true,
                }
            }
            live
        };

        // Mass-weighted center of mass of the whole vehicle: a cheap
        // position-only pass even on partial ticks.
        let mut com_sum = Vector3::zeros();
        let mut com_mass = 0.0;
        for part in &snapshot.parts {
            if !part.physically_significant || !part.alive || part.vehicle != snapshot.id {
                continue;
            }
            let mass = part.total_mass();
            com_sum += part.world_com() * mass;
            com_mass += mass;
        }
        let com = if com_mass > 0.0 {
            com_sum / com_mass
        } else {
            Vector3::zeros()
        };

        // The heavy pass recenters on its own selection.
        let cur_com = if all_parts {
            com
        } else {
            let mut sum = Vector3::zeros();
            let mut mass_total = 0.0;
            for part in &selected {
                if !part.alive || part.vehicle != snapshot.id || !part.physically_significant {
                    continue;
                }
                let mass = part.total_mass();
                sum += part.world_com() * mass;
                mass_total += mass;
            }
            if mass_total > 0.0 {
                sum / mass_total
            } else {
                Vector3::zeros()
            }
        };

        // Net velocity over the selected set.
        let mut impulse_sum = Vector3::zeros();
        let mut velocity_mass = 0.0;
        for part in &selected {
            if !part.physically_significant {
                continue;
            }
            if part.vehicle != snapshot.id || !part.alive {
                stale = true;
                continue;
            }
            let mass = part.total_mass();
            impulse_sum += part.world_velocity() * mass;
            velocity_mass += mass;
        }
        let mut world_velocity = if velocity_mass > 0.0 {
            impulse_sum / velocity_mass
        } else {
            Vector3::zeros()
        };

        // Moments.
        let mut moi = Vector3::zeros();
        let mut angular_momentum = Vector3::zeros();
        let mut mass_sum = 0.0;
        if all_parts {
            self.massive_parts.clear();
        }
        for part in &selected {
            if !part.physically_significant {
                continue;
            }
            if part.vehicle != snapshot.id || !part.alive {
                stale = true;
                continue;
            }
            let mass = part.total_mass();
            let pv = world_to_ref * (part.world_com() - cur_com);
            let impulse = (world_to_ref * (part.world_velocity() - world_velocity)) * mass;

            // The part as an offset point mass.
            moi += Vector3::new(
                pv.y * pv.y + pv.z * pv.z,
                pv.x * pv.x + pv.z * pv.z,
                pv.x * pv.x + pv.y * pv.y,
            ) * mass;
            angular_momentum += pv.cross(&impulse);

            // The part as a spinning rigid body, where it has one.
            if let Some(body) = &part.body {
                let principal_to_ref = world_to_ref * part.rotation * body.inertia_rotation;
                let rotated = rotated_inertia_diagonal(body.inertia_diagonal, &principal_to_ref);
                moi += rotated;
                angular_momentum += rotated.component_mul(&(world_to_ref * body.angular_velocity));
            }

            if all_parts {
                self.massive_parts.push(MassivePart { id: part.id, mass });
                mass_sum += mass;
            }
        }

        let mut angular_velocity = component_divide(angular_momentum, moi);
        if all_parts {
            self.massive_parts.sort_by(|a, b| b.mass.total_cmp(&a.mass));
            self.massive_parts.truncate(self.max_tracked_parts);
            self.state.mass = mass_sum;
            self.state.inertia = moi;
            self.state.angular_momentum = angular_momentum;
            self.state.reaction_torque = reaction_torque(snapshot);
        } else {
            // Translate the subset velocity back to the true center of mass.
            world_velocity -= (cur_com - com).cross(&(reference * angular_velocity));
        }

        // The simulation frame rotates with the planet; fold that out to get
        // the true inertial rate.
        angular_velocity -= world_to_ref * snapshot.frame_angular_velocity;

        self.state.angular_velocity = angular_velocity;
        self.state.center_of_mass = com;
        self.state.world_velocity = world_velocity;
        self.state.reference_rotation = reference;
        stale
    }
}

fn reaction_torque(snapshot: &VehicleSnapshot) -> Vector3<f64> {
    let mut total = Vector3::zeros();
    for part in &snapshot.parts {
        if !part.alive || part.vehicle != snapshot.id {
            continue;
        }
        if let Some(wheel) = &part.reaction_wheel {
            if wheel.active {
                total += wheel.torque;
            }
        }
    }
    total
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
