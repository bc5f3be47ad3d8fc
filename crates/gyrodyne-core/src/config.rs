//! Tunable parameters for the estimation and control stack.
//!
//! Every threshold the pipeline consults lives here as a named field with a
//! serde default, so a host can ship a partial TOML file and still get the
//! flight-tested values.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_buffer_capacity() -> usize {
    15
}
const fn default_max_tracked_parts() -> usize {
    20
}
const fn default_full_pass_interval() -> u32 {
    80
}
const fn default_stability_tolerance() -> f64 {
    0.1
}
const fn default_significance_threshold() -> f64 {
    0.05
}
const fn default_min_authority() -> f64 {
    0.1
}
const fn default_input_lag_ticks() -> usize {
    3
}
const fn default_kp() -> f64 {
    5.0
}
const fn default_kd() -> f64 {
    0.4
}
const fn default_integral_clamp() -> f64 {
    0.1
}
const fn default_accumulator_clamp() -> f64 {
    1.0
}
const fn default_accumulator_deriv_clamp() -> f64 {
    0.25
}
const fn default_integral_gain() -> f64 {
    1.0
}
const fn default_max_deflection_rate() -> f64 {
    2.0
}
const fn default_blend_time_constant() -> f64 {
    0.25
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Parameters of the rigid-body aggregation and authority identification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Capacity of every per-axis history buffer (default: 15).
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// How many of the most massive parts the partial-pass cache keeps
    /// (default: 20).
    #[serde(default = "default_max_tracked_parts")]
    pub max_tracked_parts: usize,

    /// Ticks between full aggregation passes; other ticks run the cheap
    /// partial pass over the cached parts (default: 80).
    #[serde(default = "default_full_pass_interval")]
    pub full_pass_interval: u32,

    /// Relative tolerance for calling consecutive timesteps stable
    /// (default: 0.1).
    #[serde(default = "default_stability_tolerance")]
    pub stability_tolerance: f64,

    /// Smallest control-input change worth identifying against
    /// (default: 0.05). Smaller changes are noise-dominated.
    #[serde(default = "default_significance_threshold")]
    pub significance_threshold: f64,

    /// Smallest identified authority accepted into the model (default: 0.1).
    #[serde(default = "default_min_authority")]
    pub min_authority: f64,

    /// Tick lag between a control change and the acceleration response it
    /// is matched against, aligning with actuator response delay
    /// (default: 3).
    #[serde(default = "default_input_lag_ticks")]
    pub input_lag_ticks: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            max_tracked_parts: default_max_tracked_parts(),
            full_pass_interval: default_full_pass_interval(),
            stability_tolerance: default_stability_tolerance(),
            significance_threshold: default_significance_threshold(),
            min_authority: default_min_authority(),
            input_lag_ticks: default_input_lag_ticks(),
        }
    }
}

impl ModelConfig {
    /// Validate parameter ranges. Returns `Err` on the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The smoothing kernels read 7 samples and identification reads one
        // past the input lag window.
        if self.buffer_capacity < 8 {
            return Err(ConfigError::invalid("buffer_capacity", "must be >= 8"));
        }
        if self.max_tracked_parts == 0 {
            return Err(ConfigError::invalid("max_tracked_parts", "must be > 0"));
        }
        if self.full_pass_interval == 0 {
            return Err(ConfigError::invalid("full_pass_interval", "must be > 0"));
        }
        if !(self.stability_tolerance > 0.0 && self.stability_tolerance < 1.0) {
            return Err(ConfigError::invalid(
                "stability_tolerance",
                "must be in (0, 1)",
            ));
        }
        if self.significance_threshold <= 0.0 {
            return Err(ConfigError::invalid(
                "significance_threshold",
                "must be > 0",
            ));
        }
        if self.min_authority <= 0.0 {
            return Err(ConfigError::invalid("min_authority", "must be > 0"));
        }
        if self.input_lag_ticks == 0 || self.input_lag_ticks + 2 > self.buffer_capacity {
            return Err(ConfigError::invalid(
                "input_lag_ticks",
                format!(
                    "must be >= 1 and leave room in a {}-sample buffer",
                    self.buffer_capacity
                ),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ControllerConfig
// ---------------------------------------------------------------------------

/// Gains and anti-windup clamps for one PID-family controller.
///
/// Defaults are the yaw-damper tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Proportional gain.
    #[serde(default = "default_kp")]
    pub kp: f64,

    /// Integral gain.
    #[serde(default)]
    pub ki: f64,

    /// Derivative gain. Ignored by the PI-only controller.
    #[serde(default = "default_kd")]
    pub kd: f64,

    /// Largest error magnitude that is still allowed to feed the integral
    /// accumulator.
    #[serde(default = "default_integral_clamp")]
    pub integral_clamp: f64,

    /// Magnitude clamp on the integral accumulator itself.
    #[serde(default = "default_accumulator_clamp")]
    pub accumulator_clamp: f64,

    /// Clamp on the accumulator's rate of change, per second.
    #[serde(default = "default_accumulator_deriv_clamp")]
    pub accumulator_deriv_clamp: f64,

    /// Gain applied to the raw trapezoidal increment before clamping.
    #[serde(default = "default_integral_gain")]
    pub integral_gain: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            kp: default_kp(),
            ki: 0.0,
            kd: default_kd(),
            integral_clamp: default_integral_clamp(),
            accumulator_clamp: default_accumulator_clamp(),
            accumulator_deriv_clamp: default_accumulator_deriv_clamp(),
            integral_gain: default_integral_gain(),
        }
    }
}

impl ControllerConfig {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.integral_clamp < 0.0 {
            return Err(ConfigError::invalid("integral_clamp", "must be >= 0"));
        }
        if self.accumulator_clamp < 0.0 {
            return Err(ConfigError::invalid("accumulator_clamp", "must be >= 0"));
        }
        if self.accumulator_deriv_clamp < 0.0 {
            return Err(ConfigError::invalid(
                "accumulator_deriv_clamp",
                "must be >= 0",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ActuatorConfig
// ---------------------------------------------------------------------------

/// Control-surface deflection lag policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LagPolicyKind {
    /// Move toward the command at a bounded deflection rate.
    RateLimited,
    /// First-order exponential blend with small-error collapse.
    Exponential,
}

/// Parameters of the actuator deflection-lag model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Which lag policy the model applies to raw commands.
    #[serde(default = "ActuatorConfig::default_policy")]
    pub policy: LagPolicyKind,

    /// Maximum deflection rate in command units per second, for the
    /// rate-limited policy (default: 2.0).
    #[serde(default = "default_max_deflection_rate")]
    pub max_deflection_rate: f64,

    /// Blend time constant in seconds, for the exponential policy
    /// (default: 0.25).
    #[serde(default = "default_blend_time_constant")]
    pub blend_time_constant: f64,
}

impl ActuatorConfig {
    const fn default_policy() -> LagPolicyKind {
        LagPolicyKind::RateLimited
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_deflection_rate <= 0.0 {
            return Err(ConfigError::invalid("max_deflection_rate", "must be > 0"));
        }
        if self.blend_time_constant <= 0.0 {
            return Err(ConfigError::invalid("blend_time_constant", "must be > 0"));
        }
        Ok(())
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            policy: Self::default_policy(),
            max_deflection_rate: default_max_deflection_rate(),
            blend_time_constant: default_blend_time_constant(),
        }
    }
}

// ---------------------------------------------------------------------------
// GyrodyneConfig
// ---------------------------------------------------------------------------

/// Complete stack configuration, loadable from a TOML file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GyrodyneConfig {
    /// Estimation pipeline parameters.
    #[serde(default)]
    pub model: ModelConfig,

    /// Actuator lag parameters.
    #[serde(default)]
    pub actuator: ActuatorConfig,

    /// Per-axis damper controller gains.
    #[serde(default)]
    pub damper: DamperConfig,
}

/// Damper gains for each rotation axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DamperConfig {
    /// Pitch-axis controller gains.
    #[serde(default)]
    pub pitch: ControllerConfig,
    /// Roll-axis controller gains.
    #[serde(default)]
    pub roll: ControllerConfig,
    /// Yaw-axis controller gains.
    #[serde(default)]
    pub yaw: ControllerConfig,
}

impl GyrodyneConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        self.actuator.validate()?;
        self.damper.pitch.validate()?;
        self.damper.roll.validate()?;
        self.damper.yaw.validate()?;
        Ok(())
    }

    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- defaults ----

    #[test]
    fn model_config_default_values() {
        let cfg = ModelConfig::default();
        assert_eq!(cfg.buffer_capacity, 15);
        assert_eq!(cfg.max_tracked_parts, 20);
        assert_eq!(cfg.full_pass_interval, 80);
        assert!((cfg.stability_tolerance - 0.1).abs() < f64::EPSILON);
        assert!((cfg.significance_threshold - 0.05).abs() < f64::EPSILON);
        assert!((cfg.min_authority - 0.1).abs() < f64::EPSILON);
        assert_eq!(cfg.input_lag_ticks, 3);
    }

    #[test]
    fn controller_config_default_values() {
        let cfg = ControllerConfig::default();
        assert!((cfg.kp - 5.0).abs() < f64::EPSILON);
        assert!(cfg.ki.abs() < f64::EPSILON);
        assert!((cfg.kd - 0.4).abs() < f64::EPSILON);
        assert!((cfg.integral_clamp - 0.1).abs() < f64::EPSILON);
        assert!((cfg.accumulator_clamp - 1.0).abs() < f64::EPSILON);
        assert!((cfg.accumulator_deriv_clamp - 0.25).abs() < f64::EPSILON);
        assert!((cfg.integral_gain - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn actuator_config_default_values() {
        let cfg = ActuatorConfig::default();
        assert_eq!(cfg.policy, LagPolicyKind::RateLimited);
        assert!((cfg.max_deflection_rate - 2.0).abs() < f64::EPSILON);
        assert!((cfg.blend_time_constant - 0.25).abs() < f64::EPSILON);
    }

    // ---- validation ----

    #[test]
    fn default_config_validates() {
        assert!(GyrodyneConfig::default().validate().is_ok());
    }

    #[test]
    fn buffer_capacity_too_small_rejected() {
        let cfg = ModelConfig {
            buffer_capacity: 7,
            ..ModelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_full_pass_interval_rejected() {
        let cfg = ModelConfig {
            full_pass_interval: 0,
            ..ModelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn stability_tolerance_bounds_rejected() {
        for tolerance in [0.0, 1.0, -0.1] {
            let cfg = ModelConfig {
                stability_tolerance: tolerance,
                ..ModelConfig::default()
            };
            assert!(cfg.validate().is_err(), "tolerance {tolerance} accepted");
        }
    }

    #[test]
    fn input_lag_must_fit_buffer() {
        let cfg = ModelConfig {
            buffer_capacity: 8,
            input_lag_ticks: 7,
            ..ModelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_clamps_rejected() {
        let cfg = ControllerConfig {
            accumulator_clamp: -1.0,
            ..ControllerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_deflection_rate_rejected() {
        let cfg = ActuatorConfig {
            max_deflection_rate: 0.0,
            ..ActuatorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    // ---- TOML ----

    #[test]
    fn toml_partial_file_gets_defaults() {
        let toml_str = r"
            [model]
            full_pass_interval = 40

            [actuator]
            policy = 'exponential'
        ";
        let cfg: GyrodyneConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.model.full_pass_interval, 40);
        assert_eq!(cfg.model.buffer_capacity, 15);
        assert_eq!(cfg.actuator.policy, LagPolicyKind::Exponential);
        assert!((cfg.actuator.blend_time_constant - 0.25).abs() < f64::EPSILON);
        assert!((cfg.damper.yaw.kp - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn toml_empty_file_is_default() {
        let cfg: GyrodyneConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, GyrodyneConfig::default());
    }

    #[test]
    fn toml_damper_overrides() {
        let toml_str = r"
            [damper.pitch]
            kp = 2.0
            ki = 0.5
        ";
        let cfg: GyrodyneConfig = toml::from_str(toml_str).unwrap();
        assert!((cfg.damper.pitch.kp - 2.0).abs() < f64::EPSILON);
        assert!((cfg.damper.pitch.ki - 0.5).abs() < f64::EPSILON);
        // Unmentioned axes keep defaults.
        assert!((cfg.damper.roll.kp - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn from_file_roundtrip() {
        let dir = std::env::temp_dir().join("gyrodyne_test_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stack.toml");
        std::fs::write(
            &path,
            r"
            [model]
            max_tracked_parts = 10
        ",
        )
        .unwrap();

        let cfg = GyrodyneConfig::from_file(&path).unwrap();
        assert_eq!(cfg.model.max_tracked_parts, 10);

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn from_file_rejects_invalid() {
        let dir = std::env::temp_dir().join("gyrodyne_test_config_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(
            &path,
            r"
            [model]
            full_pass_interval = 0
        ",
        )
        .unwrap();

        assert!(GyrodyneConfig::from_file(&path).is_err());

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn from_file_not_found() {
        assert!(GyrodyneConfig::from_file("/nonexistent/gyrodyne.toml").is_err());
    }
}
