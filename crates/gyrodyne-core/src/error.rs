use thiserror::Error;

/// Top-level error type for the gyrodyne stack.
///
/// Deliberately small: numerical hazards on the tick path (near-zero mass,
/// unidentifiable authority, timestep jumps) degrade to defined neutral
/// values instead of erroring, because a stalled control loop is itself a
/// failure. Errors are reserved for construction and configuration.
#[derive(Debug, Error)]
pub enum GyrodyneError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Shorthand for an [`InvalidValue`](Self::InvalidValue) error.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}
