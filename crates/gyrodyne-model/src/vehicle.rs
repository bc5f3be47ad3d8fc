//! Per-vehicle estimation pipeline.
//!
//! [`VehicleModel`] owns the timestep tracker, the rigid-body estimator, and
//! one [`AxisControlModel`] per rotation axis, and runs them in dependency
//! order inside the host's fixed-timestep callback:
//!
//! 1. aggregation (rigid-body pass over the snapshot),
//! 2. velocity buffer update,
//! 3. differentiation,
//! 4. authority identification.
//!
//! Control input is recorded separately through
//! [`record_controls`](VehicleModel::record_controls) *after* the host's
//! control pass, so identification always correlates accelerations against
//! inputs that were actually applied on earlier ticks.

use nalgebra::Vector3;

use gyrodyne_core::axis::{PerAxis, RotationAxis};
use gyrodyne_core::config::{GyrodyneConfig, ModelConfig};
use gyrodyne_core::snapshot::{PilotInput, VehicleSnapshot};
use gyrodyne_core::time::TimestepTracker;
use gyrodyne_control::servo::LagPolicy;

use crate::axis_model::AxisControlModel;
use crate::rigid_body::{RigidBodyEstimator, RigidBodyState};

/// Consecutive stable ticks required before the smoothing differentiators
/// are trusted.
const DERIVATIVE_STABLE_TICKS: u32 = 7;

/// Consecutive stable ticks required before authority identification runs.
const IDENTIFY_STABLE_TICKS: u32 = 6;

/// Projected-speed floor (m/s, squared) under which angle of attack reads
/// zero rather than amplifying parked-vehicle jitter.
const AOA_SPEED_FLOOR_SQ: f64 = 1.0;

// ---------------------------------------------------------------------------
// VehicleModel
// ---------------------------------------------------------------------------

/// Complete per-vehicle estimation state.
///
/// One instance per vehicle, confined to the physics callback thread.
#[derive(Debug, Clone)]
pub struct VehicleModel {
    config: ModelConfig,
    lag: LagPolicy,
    tracker: TimestepTracker,
    rigid_body: RigidBodyEstimator,
    axes: PerAxis<AxisControlModel>,
}

impl VehicleModel {
    /// Build a model from stack configuration. The configuration is assumed
    /// validated.
    pub fn new(config: &GyrodyneConfig) -> Self {
        Self {
            config: config.model.clone(),
            lag: LagPolicy::from_config(&config.actuator),
            tracker: TimestepTracker::new(config.model.stability_tolerance),
            rigid_body: RigidBodyEstimator::new(&config.model),
            axes: PerAxis::from_fn(|_| AxisControlModel::new(config.model.buffer_capacity)),
        }
    }

    /// Run one estimation tick against a fresh snapshot.
    ///
    /// Executes aggregation, buffer updates, differentiation, and
    /// identification, in that order. Call once per physics tick, before
    /// the host's control pass.
    pub fn tick(&mut self, snapshot: &VehicleSnapshot, dt: f64) {
        if snapshot.landed {
            // Ground contact breaks the free-rotation model: keep the mass
            // properties fresh but invalidate everything derivative-based.
            self.tracker.reset();
            for (_, axis) in self.axes.iter_mut() {
                axis.invalidate_derivatives();
            }
            self.rigid_body.update(snapshot);
            return;
        }

        let stable = self.tracker.observe(dt);
        if !stable {
            // The new sample spacing makes existing derivative history lie
            // about dt; raw samples stay.
            for (_, axis) in self.axes.iter_mut() {
                axis.invalidate_derivatives();
            }
        }

        self.rigid_body.update(snapshot);

        let rates = self.rigid_body.state().angular_velocity;
        let can_differentiate = self.tracker.is_stable_for(DERIVATIVE_STABLE_TICKS);
        for (axis, model) in self.axes.iter_mut() {
            model.record_velocity(axis_rate(rates, axis));
            if can_differentiate && model.velocity_sample_count() >= 7 {
                model.update_derivatives(dt);
            }
        }

        if self.tracker.is_stable_for(IDENTIFY_STABLE_TICKS) {
            for (_, model) in self.axes.iter_mut() {
                model.identify(dt, &self.config);
            }
        }

        self.update_angle_of_attack(snapshot);
    }

    /// Record the tick's raw per-axis commands and the deflection the
    /// actuators actually reach after one tick of lag.
    ///
    /// Call after the host's control pass, once per tick.
    pub fn record_controls(&mut self, input: &PilotInput) {
        let dt = self.tracker.last_dt();
        let lag = self.lag;
        let lag_valid = self.tracker.is_stable_for(1);
        for (axis, model) in self.axes.iter_mut() {
            let raw = input.command[axis].clamp(-1.0, 1.0);
            model.record_input(raw);
            let actuated = match model.actuated() {
                Some(previous) if lag_valid => lag.apply(previous, raw, dt),
                _ => raw,
            };
            model.record_actuated(actuated);
        }
    }

    fn update_angle_of_attack(&mut self, snapshot: &VehicleSnapshot) {
        // Surface velocity in the reference frame: x starboard,
        // y longitudinal (nose), z ventral.
        let v = snapshot.reference_rotation.inverse() * snapshot.surface_velocity;

        let pitch_plane = Vector3::new(0.0, v.y, v.z);
        self.axes[RotationAxis::Pitch]
            .record_angle_of_attack(plane_aoa(&pitch_plane, v.z, v.y < 0.0));

        let yaw_plane = Vector3::new(v.x, v.y, 0.0);
        self.axes[RotationAxis::Yaw].record_angle_of_attack(plane_aoa(&yaw_plane, -v.x, v.y < 0.0));

        let roll_plane = Vector3::new(v.x, 0.0, v.z);
        self.axes[RotationAxis::Roll]
            .record_angle_of_attack(plane_aoa(&roll_plane, v.z, v.x < 0.0));
    }

    // -- queries --

    /// Read-only rigid-body snapshot.
    pub const fn state(&self) -> &RigidBodyState {
        self.rigid_body.state()
    }

    /// Per-axis model for detailed inspection.
    pub fn axis(&self, axis: RotationAxis) -> &AxisControlModel {
        &self.axes[axis]
    }

    /// Rolling-average control authority for an axis.
    pub fn authority(&self, axis: RotationAxis) -> f64 {
        self.axes[axis].authority()
    }

    /// Most recent accepted authority sample for an axis.
    pub fn authority_instant(&self, axis: RotationAxis) -> f64 {
        self.axes[axis].authority_instant()
    }

    /// Input change needed for a desired angular-acceleration change.
    pub fn input_delta_for(&self, axis: RotationAxis, desired_accel_change: f64) -> f64 {
        self.axes[axis].input_delta_for(desired_accel_change)
    }

    /// Latest actuated commands, in [-1, 1], zero before any control pass.
    pub fn actuated_commands(&self) -> PerAxis<f64> {
        PerAxis::from_fn(|axis| self.axes[axis].actuated().unwrap_or(0.0))
    }

    /// Current length of the stable-timestep run.
    pub const fn stable_ticks(&self) -> u32 {
        self.tracker.stable_ticks()
    }

    /// The underlying rigid-body estimator.
    pub const fn rigid_body(&self) -> &RigidBodyEstimator {
        &self.rigid_body
    }
}

fn axis_rate(rates: Vector3<f64>, axis: RotationAxis) -> f64 {
    // Reference-frame convention: x is the pitch axis, y roll, z yaw.
    match axis {
        RotationAxis::Pitch => rates.x,
        RotationAxis::Roll => rates.y,
        RotationAxis::Yaw => rates.z,
    }
}

/// Angle of attack within one body plane.
///
/// `projected` is the surface velocity restricted to the plane,
/// `opposed_component` the component the angle is measured against, and
/// `reversed` whether the flow comes from behind (quadrant correction).
fn plane_aoa(projected: &Vector3<f64>, opposed_component: f64, reversed: bool) -> f64 {
    if projected.norm_squared() <= AOA_SPEED_FLOOR_SQ {
        return 0.0;
    }
    let angle = (opposed_component / projected.norm()).clamp(-1.0, 1.0).asin();
    if reversed {
        std::f64::consts::PI - angle
    } else {
        angle
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gyrodyne_core::snapshot::{PartSnapshot, VehicleId};
    use nalgebra::UnitQuaternion;

    const DT: f64 = 0.02;
    const VEHICLE: VehicleId = VehicleId(1);

    fn dumbbell_snapshot(spin_rate: f64) -> VehicleSnapshot {
        // Two 1 t masses at x = ±1 m whose velocities realize a pure spin
        // about the yaw (z) axis at `spin_rate` rad/s.
        let mut a = PartSnapshot::point_mass(1, VEHICLE, 1.0, Vector3::new(1.0, 0.0, 0.0));
        a.velocity = Vector3::new(0.0, spin_rate, 0.0);
        let mut b = PartSnapshot::point_mass(2, VEHICLE, 1.0, Vector3::new(-1.0, 0.0, 0.0));
        b.velocity = Vector3::new(0.0, -spin_rate, 0.0);
        VehicleSnapshot {
            id: VEHICLE,
            reference_rotation: UnitQuaternion::identity(),
            frame_angular_velocity: Vector3::zeros(),
            surface_velocity: Vector3::zeros(),
            landed: false,
            parts: vec![a, b],
        }
    }

    fn model() -> VehicleModel {
        VehicleModel::new(&GyrodyneConfig::default())
    }

    // ---- pipeline ordering and gating ----

    #[test]
    fn velocity_recorded_every_tick() {
        let mut m = model();
        m.tick(&dumbbell_snapshot(0.5), DT);
        let yaw = m.axis(RotationAxis::Yaw);
        assert_eq!(yaw.velocity_sample_count(), 1);
        assert!((yaw.angular_velocity().unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn derivatives_wait_for_stable_run() {
        let mut m = model();
        let snapshot = dumbbell_snapshot(0.5);
        for tick in 0..12 {
            m.tick(&snapshot, DT);
            let yaw = m.axis(RotationAxis::Yaw);
            // Tick 0 is a discontinuity; the stable run reaches 7 on tick 7.
            if tick < 7 {
                assert_eq!(yaw.smoothed_sample_count(), 0, "tick {tick}");
            } else {
                assert!(yaw.smoothed_sample_count() > 0, "tick {tick}");
            }
        }
    }

    #[test]
    fn constant_spin_reads_zero_acceleration() {
        let mut m = model();
        let snapshot = dumbbell_snapshot(0.5);
        for _ in 0..15 {
            m.tick(&snapshot, DT);
        }
        let yaw = m.axis(RotationAxis::Yaw);
        assert!(yaw.acceleration().unwrap().abs() < 1e-9);
        assert!(yaw.smoothed_acceleration().unwrap().abs() < 1e-9);
    }

    #[test]
    fn timestep_jump_clears_derivative_history() {
        let mut m = model();
        let snapshot = dumbbell_snapshot(0.5);
        for _ in 0..10 {
            m.tick(&snapshot, DT);
        }
        assert!(m.axis(RotationAxis::Yaw).smoothed_sample_count() > 0);

        // Time-warp: one long tick.
        m.tick(&snapshot, 0.5);
        assert_eq!(m.stable_ticks(), 0);
        assert_eq!(m.axis(RotationAxis::Yaw).smoothed_sample_count(), 0);
        // Raw velocity history survives.
        assert!(m.axis(RotationAxis::Yaw).velocity_sample_count() > 0);

        // Returning to the old dt is itself a discontinuity, then the run
        // rebuilds; derivatives refuse to emit until 7 stable ticks.
        for tick in 0..10 {
            m.tick(&snapshot, DT);
            let count = m.axis(RotationAxis::Yaw).smoothed_sample_count();
            if tick < 7 {
                assert_eq!(count, 0, "tick {tick}");
            }
        }
        assert!(m.axis(RotationAxis::Yaw).smoothed_sample_count() > 0);
    }

    #[test]
    fn landed_vehicle_resets_stability_but_keeps_mass() {
        let mut m = model();
        let mut snapshot = dumbbell_snapshot(0.5);
        for _ in 0..10 {
            m.tick(&snapshot, DT);
        }
        snapshot.landed = true;
        m.tick(&snapshot, DT);
        assert_eq!(m.stable_ticks(), 0);
        assert_eq!(m.axis(RotationAxis::Yaw).smoothed_sample_count(), 0);
        assert!((m.state().mass - 2.0).abs() < f64::EPSILON);
    }

    // ---- control recording ----

    #[test]
    fn first_control_sample_bypasses_lag() {
        let mut m = model();
        m.tick(&dumbbell_snapshot(0.0), DT);
        m.record_controls(&PilotInput::from_commands(0.0, 0.0, 1.0));
        // No previous actuated sample: the surface starts at the command.
        let actuated = m.actuated_commands();
        assert!((actuated[RotationAxis::Yaw] - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn actuated_command_lags_raw_command() {
        let mut m = model();
        let snapshot = dumbbell_snapshot(0.0);
        m.tick(&snapshot, DT);
        m.record_controls(&PilotInput::from_commands(0.0, 0.0, 0.0));
        m.tick(&snapshot, DT);
        m.record_controls(&PilotInput::from_commands(0.0, 0.0, 1.0));
        let actuated = m.actuated_commands()[RotationAxis::Yaw];
        // Rate-limited default: 2.0 per second * 0.02 s.
        assert!((actuated - 0.04).abs() < 1e-12);
        assert!((m.axis(RotationAxis::Yaw).input().unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn commands_clamped_to_unit_range() {
        let mut m = model();
        m.tick(&dumbbell_snapshot(0.0), DT);
        let mut input = PilotInput::from_commands(0.0, 0.0, 0.0);
        input.command[RotationAxis::Pitch] = 7.5;
        m.record_controls(&input);
        assert!((m.axis(RotationAxis::Pitch).input().unwrap() - 1.0).abs() < f64::EPSILON);
    }

    // ---- authority queries ----

    #[test]
    fn authority_defaults_neutral() {
        let m = model();
        for axis in RotationAxis::ALL {
            assert!((m.authority(axis) - 1.0).abs() < f64::EPSILON);
            assert!((m.authority_instant(axis) - 1.0).abs() < f64::EPSILON);
        }
    }

    // ---- angle of attack ----

    #[test]
    fn aoa_zero_below_speed_floor() {
        let mut m = model();
        let mut snapshot = dumbbell_snapshot(0.0);
        snapshot.surface_velocity = Vector3::new(0.1, 0.2, 0.1);
        m.tick(&snapshot, DT);
        for axis in RotationAxis::ALL {
            assert!(m.axis(axis).angle_of_attack().unwrap().abs() < f64::EPSILON);
        }
    }

    #[test]
    fn forward_flight_with_sink_reads_positive_pitch_aoa() {
        let mut m = model();
        let mut snapshot = dumbbell_snapshot(0.0);
        // 100 m/s along the nose, 10 m/s toward the belly.
        snapshot.surface_velocity = Vector3::new(0.0, 100.0, 10.0);
        m.tick(&snapshot, DT);
        let aoa = m.axis(RotationAxis::Pitch).angle_of_attack().unwrap();
        let expected = (10.0_f64 / (100.0_f64.hypot(10.0))).asin();
        assert!((aoa - expected).abs() < 1e-12);
        // Pure forward flight: no sideslip.
        assert!(m.axis(RotationAxis::Yaw).angle_of_attack().unwrap().abs() < 1e-12);
    }

    #[test]
    fn backward_flight_quadrant_corrected() {
        let mut m = model();
        let mut snapshot = dumbbell_snapshot(0.0);
        snapshot.surface_velocity = Vector3::new(0.0, -100.0, 10.0);
        m.tick(&snapshot, DT);
        let aoa = m.axis(RotationAxis::Pitch).angle_of_attack().unwrap();
        assert!(aoa > std::f64::consts::FRAC_PI_2);
    }
}
