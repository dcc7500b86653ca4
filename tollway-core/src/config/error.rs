//! Configuration error types with detailed error reporting

use crate::http::TransportError;
use crate::providers::ProviderError;
use std::fmt;
use thiserror::Error;

/// Main configuration error type with detailed context
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load env file '{path}': {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Required environment variable not set: {var}")]
    EnvVarNotFound { var: String },

    #[error("Environment variable {key} must be {expected}: {value}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unknown provider: {provider}. Available: {available:?}")]
    UnknownProvider {
        provider: String,
        available: Vec<String>,
    },

    #[error("API key not set for {provider}. Set {env_var} in your environment.")]
    MissingCredential { provider: String, env_var: String },

    #[error("API key for {provider} is a placeholder. Replace the value of {env_var} with a real key.")]
    PlaceholderCredential { provider: String, env_var: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to construct {provider} client: {source}")]
    ClientConstruction {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

/// Validation error with field path for precise error reporting
#[derive(Debug, Error)]
pub struct ValidationError {
    /// Path to the field that failed validation (e.g., "retry.max_delay_ms")
    pub field_path: String,
    /// The validation error kind
    pub kind: ValidationErrorKind,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed at '{}': {}", self.field_path, self.kind)
    }
}

/// Specific validation error types
#[derive(Debug, Error)]
pub enum ValidationErrorKind {
    #[error("value out of range: {message}")]
    OutOfRange { message: String },
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(field_path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field_path: field_path.into(),
            kind,
        }
    }

    /// Helper to create an out of range error
    pub fn out_of_range(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::OutOfRange {
                message: message.into(),
            },
        )
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
