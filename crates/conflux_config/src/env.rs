//! Environment variable overlay.

use crate::source::ConfigSource;

/// A [`ConfigSource`] that reads process environment variables first and
/// falls back to an inner source.
///
/// Keys are mapped to variable names by upper-casing them and replacing every
/// character that is not ASCII alphanumeric with `_`, so
/// `conflux.rag.max-results` is read from `CONFLUX_RAG_MAX_RESULTS`.
#[derive(Debug, Clone)]
pub struct EnvConfig<S> {
    prefix: Option<String>,
    fallback: S,
}

impl<S: ConfigSource> EnvConfig<S> {
    /// Layers the environment over `fallback`.
    pub fn new(fallback: S) -> Self {
        Self {
            prefix: None,
            fallback,
        }
    }

    /// Only consult the environment for keys starting with `prefix`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Returns the environment variable name used for `key`.
    #[must_use]
    pub fn variable_name(key: &str) -> String {
        key.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl<S: ConfigSource> ConfigSource for EnvConfig<S> {
    fn get_string(&self, key: &str) -> Option<String> {
        let eligible = self
            .prefix
            .as_deref()
            .is_none_or(|prefix| key.starts_with(prefix));
        if eligible && let Ok(value) = std::env::var(Self::variable_name(key)) {
            return Some(value);
        }
        self.fallback.get_string(key)
    }
}
