//! The [`ConfigSource`] trait.

use crate::error::ConfigError;
use core::str::FromStr;
use std::collections::HashMap;

/// A read-only key → value configuration lookup.
///
/// Only [`get_string`](Self::get_string) must be implemented; every other
/// accessor is derived from it. Sources are shared across the startup pass and
/// the running services, so they must be `Send + Sync`.
///
/// # Parsing rules
///
/// - Booleans accept `true` / `false` in any letter case.
/// - Lists split on `,`, trim each entry and drop empty entries.
/// - Maps split on `,` into `k=v` pairs. A pair that does not contain exactly
///   one `=` is dropped without error. Keys and values are trimmed and may be
///   empty.
pub trait ConfigSource: Send + Sync + 'static {
    /// Returns the raw value stored under `key`.
    fn get_string(&self, key: &str) -> Option<String>;

    /// Returns the value under `key` parsed as a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the value is neither `true` nor `false`.
    fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.get_string(key) {
            None => Ok(None),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(ConfigError::invalid(key, &raw, "bool")),
            },
        }
    }

    /// Returns the value under `key` parsed as an `i32`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the value is not an integer in range.
    fn get_i32(&self, key: &str) -> Result<Option<i32>, ConfigError> {
        parse_value(key, self.get_string(key), "i32")
    }

    /// Returns the value under `key` parsed as an `i64`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the value is not an integer in range.
    fn get_i64(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        parse_value(key, self.get_string(key), "i64")
    }

    /// Returns the value under `key` parsed as an `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the value is not a number.
    fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        parse_value(key, self.get_string(key), "f64")
    }

    /// Returns the comma-separated list stored under `key`.
    ///
    /// A missing key yields an empty list.
    fn get_list(&self, key: &str) -> Vec<String> {
        self.get_string(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the `k=v,k=v` map stored under `key`.
    fn get_map_string(&self, key: &str) -> HashMap<String, String> {
        self.get_string(key)
            .map(|raw| split_pairs(&raw).collect())
            .unwrap_or_default()
    }

    /// Returns the `k=v,k=v` map stored under `key` with integer values.
    ///
    /// Malformed pairs are dropped the same way as in
    /// [`get_map_string`](Self::get_map_string).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a well-formed pair has a value
    /// that is not an integer.
    fn get_map_integer(&self, key: &str) -> Result<HashMap<String, i64>, ConfigError> {
        let Some(raw) = self.get_string(key) else {
            return Ok(HashMap::new());
        };
        split_pairs(&raw)
            .map(|(name, value)| {
                value
                    .parse::<i64>()
                    .map(|parsed| (name, parsed))
                    .map_err(|_| ConfigError::invalid(key, &value, "i64"))
            })
            .collect()
    }
}

fn parse_value<T: FromStr>(
    key: &str,
    raw: Option<String>,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    raw.map(|raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|_| ConfigError::invalid(key, &raw, expected))
    })
    .transpose()
}

fn split_pairs(raw: &str) -> impl Iterator<Item = (String, String)> + '_ {
    raw.split(',').filter_map(|entry| {
        let Some((name, value)) = entry.split_once('=').filter(|(_, value)| !value.contains('='))
        else {
            tracing::trace!(entry, "dropping malformed map entry");
            return None;
        };
        Some((name.trim().to_string(), value.trim().to_string()))
    })
}
