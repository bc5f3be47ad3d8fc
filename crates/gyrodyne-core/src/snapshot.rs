//! Immutable vehicle-state snapshots pulled from the host once per tick.
//!
//! The estimation core never subscribes to host events or walks live engine
//! objects; it consumes a [`VehicleSnapshot`] handed to it at the start of
//! every physics tick and produces read-only state in return. This keeps
//! the core independent of any particular host event model.

use nalgebra::{UnitQuaternion, Vector3};

use crate::axis::PerAxis;

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Opaque host identity of a physical part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartId(pub u64);

/// Opaque host identity of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VehicleId(pub u64);

// ---------------------------------------------------------------------------
// BodyState
// ---------------------------------------------------------------------------

/// Rigid-body sub-state of a part that carries its own physics body.
///
/// Parts without one (physicsless attachments) contribute as point masses
/// located at their transform position.
#[derive(Debug, Clone, Copy)]
pub struct BodyState {
    /// Mass of the physics body in tonnes.
    pub mass: f64,
    /// World-space center of mass.
    pub center_of_mass: Vector3<f64>,
    /// Principal-frame inertia tensor diagonal.
    pub inertia_diagonal: Vector3<f64>,
    /// Rotation from the principal inertia frame to the part frame.
    pub inertia_rotation: UnitQuaternion<f64>,
    /// World-space linear velocity.
    pub velocity: Vector3<f64>,
    /// World-space angular velocity in rad/s.
    pub angular_velocity: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// ReactionWheel
// ---------------------------------------------------------------------------

/// Torque authority of a part's reaction wheel, per axis.
#[derive(Debug, Clone, Copy)]
pub struct ReactionWheel {
    /// Available torque (pitch, roll, yaw) in kN·m.
    pub torque: Vector3<f64>,
    /// Whether the wheel is powered and operational this tick.
    pub active: bool,
}

// ---------------------------------------------------------------------------
// PartSnapshot
// ---------------------------------------------------------------------------

/// Per-part state sampled by the host.
#[derive(Debug, Clone)]
pub struct PartSnapshot {
    /// Host identity of the part.
    pub id: PartId,
    /// Vehicle the part currently belongs to.
    pub vehicle: VehicleId,
    /// Dry mass in tonnes.
    pub dry_mass: f64,
    /// Mass of onboard resources in tonnes.
    pub resource_mass: f64,
    /// World-space transform position.
    pub position: Vector3<f64>,
    /// World-space transform rotation.
    pub rotation: UnitQuaternion<f64>,
    /// Center-of-mass offset in the part frame.
    pub com_offset: Vector3<f64>,
    /// Linear velocity used when no physics body is present.
    pub velocity: Vector3<f64>,
    /// Rigid-body sub-state, when the part has its own physics body.
    pub body: Option<BodyState>,
    /// Whether the part participates in physics at all.
    pub physically_significant: bool,
    /// `false` once the part has been destroyed or detached.
    pub alive: bool,
    /// Reaction wheel module, if the part carries one.
    pub reaction_wheel: Option<ReactionWheel>,
}

impl PartSnapshot {
    /// Minimal physically significant point mass, for hosts and tests that
    /// build synthetic vehicles.
    pub fn point_mass(id: u64, vehicle: VehicleId, mass: f64, position: Vector3<f64>) -> Self {
        Self {
            id: PartId(id),
            vehicle,
            dry_mass: mass,
            resource_mass: 0.0,
            position,
            rotation: UnitQuaternion::identity(),
            com_offset: Vector3::zeros(),
            velocity: Vector3::zeros(),
            body: None,
            physically_significant: true,
            alive: true,
            reaction_wheel: None,
        }
    }

    /// Effective mass: the physics body's mass when present, else dry plus
    /// resource mass.
    pub fn total_mass(&self) -> f64 {
        match &self.body {
            Some(body) => body.mass,
            None => self.dry_mass + self.resource_mass,
        }
    }

    /// World-space center of mass.
    pub fn world_com(&self) -> Vector3<f64> {
        match &self.body {
            Some(body) => body.center_of_mass,
            None => self.position + self.rotation * self.com_offset,
        }
    }

    /// World-space linear velocity of the mass.
    pub fn world_velocity(&self) -> Vector3<f64> {
        match &self.body {
            Some(body) => body.velocity,
            None => self.velocity,
        }
    }
}

// ---------------------------------------------------------------------------
// VehicleSnapshot
// ---------------------------------------------------------------------------

/// Complete per-tick vehicle state pulled from the host.
#[derive(Debug, Clone)]
pub struct VehicleSnapshot {
    /// Identity of the vehicle the snapshot describes.
    pub id: VehicleId,
    /// Rotation of the controlling (reference) part, world frame.
    pub reference_rotation: UnitQuaternion<f64>,
    /// Angular velocity of the simulation frame itself (the frame rotates
    /// with the planet), world frame, rad/s.
    pub frame_angular_velocity: Vector3<f64>,
    /// Surface-relative velocity of the vehicle, world frame.
    pub surface_velocity: Vector3<f64>,
    /// Whether the vehicle is in contact with the ground. Ground contact
    /// invalidates the free-rotation model.
    pub landed: bool,
    /// All parts currently enumerated by the host.
    pub parts: Vec<PartSnapshot>,
}

// ---------------------------------------------------------------------------
// PilotInput
// ---------------------------------------------------------------------------

/// Raw per-axis rotation command and trim, each in [-1, 1].
#[derive(Debug, Clone, Copy, Default)]
pub struct PilotInput {
    /// Commanded deflection per axis.
    pub command: PerAxis<f64>,
    /// Trim setting per axis. A command equal to trim means "hands off".
    pub trim: PerAxis<f64>,
}

impl PilotInput {
    /// Build an input with commands clamped into the valid range and zero trim.
    pub fn from_commands(pitch: f64, roll: f64, yaw: f64) -> Self {
        Self {
            command: PerAxis::new(
                pitch.clamp(-1.0, 1.0),
                roll.clamp(-1.0, 1.0),
                yaw.clamp(-1.0, 1.0),
            ),
            trim: PerAxis::default(),
        }
    }

    /// Whether the pilot is commanding this axis away from its trim point.
    pub fn is_manual(&self, axis: crate::axis::RotationAxis) -> bool {
        (self.command[axis] - self.trim[axis]).abs() > f64::EPSILON
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
