//! Error types for configuration lookups.

/// Error reading a typed configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The raw value exists but cannot be parsed as the requested type.
    #[error("invalid value '{value}' for key '{key}': expected {expected}")]
    InvalidValue {
        /// The configuration key.
        key: String,
        /// The raw value found under the key.
        value: String,
        /// Human readable name of the expected type.
        expected: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, expected: &'static str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}
