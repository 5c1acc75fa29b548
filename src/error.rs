//! # Error Types
//!
//! Custom error types for GPcal using `thiserror`.

use thiserror::Error;

/// Main error type for GPcal
#[derive(Debug, Error)]
pub enum GpcalError {
    /// A parameter could not be read from or written to the device transport.
    ///
    /// Fatal for the calibration run that triggered it.
    #[error("parameter store I/O error on '{key}': {cause}")]
    StoreIo {
        /// Parameter key, e.g. `axis_leftx_max`
        key: String,
        /// Underlying I/O failure
        #[source]
        cause: std::io::Error,
    },

    /// A parameter value violates the store invariants
    #[error("invalid parameter '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No gamepad with the configured name was found
    #[error("gamepad '{0}' not found")]
    ControllerNotFound(String),

    /// Gamepad input errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// Malformed saved calibration script
    #[error("calibration script line {line}: {reason}")]
    Script { line: usize, reason: String },

    /// Session operation not allowed in the current state
    #[error("Session error: {0}")]
    Session(String),

    /// Unknown control name
    #[error("unknown control '{0}' (expected stickleft, stickright, triggerleft or triggerright)")]
    UnknownControl(String),
}

/// Result type alias for GPcal
pub type Result<T> = std::result::Result<T, GpcalError>;

impl GpcalError {
    /// Builds a [`GpcalError::StoreIo`] for `key`.
    pub fn store_io(key: impl Into<String>, cause: std::io::Error) -> Self {
        Self::StoreIo {
            key: key.into(),
            cause,
        }
    }
}
