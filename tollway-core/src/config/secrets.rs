//! Credential handling and redaction
//!
//! API keys are wrapped in [`SecretString`] so they never show up in
//! `Debug`/`Display` output or log lines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix used by template `.env` files for values that were never filled in
pub const PLACEHOLDER_PREFIX: &str = "your_";

/// A wrapper type for sensitive strings like API keys
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    /// Create a new secret string
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the actual value (use with caution)
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    /// Check if the secret is empty
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Whether the value is an unfilled template such as `your_api_key_here`
    pub fn is_placeholder(&self) -> bool {
        self.value.starts_with(PLACEHOLDER_PREFIX)
    }

}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_redaction() {
        let secret = SecretString::new("sk-1234567890abcdef");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{:?}", SecretString::default()), "[REDACTED]");
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(SecretString::new("your_openai_key_here").is_placeholder());
        assert!(!SecretString::new("sk-live-123").is_placeholder());
        assert!(!SecretString::new("").is_placeholder());
    }
}
