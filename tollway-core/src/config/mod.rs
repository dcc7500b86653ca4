//! Configuration module for Tollway
//!
//! Settings are read through the [`ConfigSource`] trait so the client factory
//! can be driven by the process environment, a loaded `.env` file, or an
//! in-memory map in tests.

mod env;
mod error;
mod secrets;

pub use env::{find_env_file, load_env, ENV_FILE_NAME};
pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use secrets::{SecretString, PLACEHOLDER_PREFIX};

use std::collections::HashMap;

/// Selects the provider adapter
pub const LLM_PROVIDER: &str = "LLM_PROVIDER";
/// Selects the model id
pub const LLM_MODEL: &str = "LLM_MODEL";
/// Response token cap
pub const LLM_MAX_TOKENS: &str = "LLM_MAX_TOKENS";
/// Sampling temperature
pub const LLM_TEMPERATURE: &str = "LLM_TEMPERATURE";
/// Endpoint override for the selected provider
pub const LLM_BASE_URL: &str = "LLM_BASE_URL";

/// A key/value configuration source
pub trait ConfigSource: Send + Sync {
    /// Look up a raw value
    fn get(&self, key: &str) -> Option<String>;

    /// Look up a value, treating empty strings as unset
    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Look up a value that must be present
    fn get_required(&self, key: &str) -> ConfigResult<String> {
        self.get_string(key).ok_or_else(|| ConfigError::EnvVarNotFound {
            var: key.to_string(),
        })
    }

    /// "true", "1", "yes" and "on" (any case) are true; anything else is false
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => matches!(
                value.trim().to_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            ),
            None => default,
        }
    }

    fn get_int(&self, key: &str) -> ConfigResult<Option<i64>> {
        parse_value(self, key, "an integer")
    }

    fn get_u32(&self, key: &str) -> ConfigResult<Option<u32>> {
        parse_value(self, key, "a non-negative integer")
    }

    fn get_float(&self, key: &str) -> ConfigResult<Option<f64>> {
        parse_value(self, key, "a number")
    }
}

fn parse_value<S, T>(source: &S, key: &str, expected: &'static str) -> ConfigResult<Option<T>>
where
    S: ConfigSource + ?Sized,
    T: std::str::FromStr,
{
    match source.get_string(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
                expected,
            }),
    }
}

/// Reads from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// An in-memory configuration map
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, replacing any previous one
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for MapSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let source: MapSource = [
            ("MAX", "4096"),
            ("TEMP", "0.7"),
            ("FLAG", "Yes"),
            ("EMPTY", ""),
            ("BAD", "lots"),
        ]
        .into_iter()
        .collect();

        assert_eq!(source.get_u32("MAX").unwrap(), Some(4096));
        assert_eq!(source.get_float("TEMP").unwrap(), Some(0.7));
        assert_eq!(source.get_int("MISSING").unwrap(), None);
        assert_eq!(source.get_int("EMPTY").unwrap(), None);
        assert!(source.get_bool("FLAG", false));
        assert!(!source.get_bool("BAD", true));
        assert!(source.get_bool("MISSING", true));
    }

    #[test]
    fn test_invalid_number_names_the_key() {
        let source = MapSource::new().with("LLM_MAX_TOKENS", "many");
        let err = source.get_u32("LLM_MAX_TOKENS").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LLM_MAX_TOKENS"));
        assert!(err.to_string().contains("many"));
    }

    #[test]
    fn test_required_value() {
        let source = MapSource::new().with("PRESENT", "x").with("BLANK", "");
        assert_eq!(source.get_required("PRESENT").unwrap(), "x");
        assert!(matches!(
            source.get_required("BLANK"),
            Err(ConfigError::EnvVarNotFound { .. })
        ));
    }
}
