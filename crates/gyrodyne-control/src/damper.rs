//! Angular-velocity damper with pilot override.
//!
//! Drives one axis's measured rotation rate toward zero while the pilot's
//! hands are off (command equal to trim).  Any manual input clears the
//! controller's accumulator and yields no output, so the integral state
//! never fights the pilot when they take back the stick.

use gyrodyne_core::config::ControllerConfig;

use crate::pid::PidController;

// ---------------------------------------------------------------------------
// RateDamper
// ---------------------------------------------------------------------------

/// One-axis rate damper around a [`PidController`].
#[derive(Debug, Clone)]
pub struct RateDamper {
    pid: PidController,
    output: f64,
}

impl RateDamper {
    /// Create a damper with the given controller gains.
    pub const fn new(config: &ControllerConfig) -> Self {
        Self {
            pid: PidController::from_config(config),
            output: 0.0,
        }
    }

    /// Run one damping step.
    ///
    /// Returns the command to write into the control channel, clamped to
    /// [-1, 1], or `None` while the pilot is commanding the axis manually.
    pub fn update(
        &mut self,
        measured_rate: f64,
        command: f64,
        trim: f64,
        dt: f64,
    ) -> Option<f64> {
        if (command - trim).abs() > f64::EPSILON {
            // Pilot has the axis; stand down and forget accumulated state.
            self.pid.clear();
            self.output = 0.0;
            return None;
        }
        self.output = self.pid.control(measured_rate, 0.0, dt).clamp(-1.0, 1.0);
        Some(self.output)
    }

    /// The last command produced, zero while standing down.
    pub const fn output(&self) -> f64 {
        self.output
    }

    /// Clear accumulated controller state.
    pub const fn clear(&mut self) {
        self.pid.clear();
        self.output = 0.0;
    }

    /// Borrow the underlying controller, e.g. for gain retuning.
    pub const fn controller_mut(&mut self) -> &mut PidController {
        &mut self.pid
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
