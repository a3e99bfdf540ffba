//! Centralized error types for Axial.
//!
//! Only caller-facing failures live here. Store and network failures are
//! absorbed at the tier boundary and never reach the caller as errors.

use thiserror::Error;

/// Main error type for Axial operations.
#[derive(Error, Debug)]
pub enum AxialError {
    #[error("Unknown algorithm: {0}")]
    InvalidAlgorithm(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing optional capability '{capability}': {hint}")]
    MissingOptionalCapability { capability: String, hint: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for Axial operations.
pub type AxialResult<T> = Result<T, AxialError>;

impl AxialError {
    /// Create an input validation error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a missing capability error with a remediation hint.
    pub fn missing_capability(capability: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingOptionalCapability {
            capability: capability.into(),
            hint: hint.into(),
        }
    }
}
