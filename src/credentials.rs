//! Process-environment credential resolution.
//!
//! Credentials are read once at startup into an in-memory map and never
//! mutated thereafter, so concurrent zone tasks can share one map without
//! locking — the Rust replacement for the Python source's module-level
//! `env_variables` dict.

use std::collections::HashMap;
use std::env;

use crate::error::{Result, ThermostatError};

/// An in-memory, write-once map of credential keys to values, read from the
/// process environment. Never logged in clear.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    values: HashMap<String, String>,
}

impl Credentials {
    /// Read every key in `keys` from the process environment. Missing keys
    /// are simply absent from the resulting map — callers that require a
    /// key call [`Credentials::require`] to get a typed [`ThermostatError::AuthError`].
    pub fn from_env<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values = HashMap::new();
        for key in keys {
            let key = key.into();
            if let Ok(value) = env::var(&key) {
                values.insert(key, value);
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Fetch a required key. A key ending in `_` is zone-indexed — the
    /// trailing underscore is replaced with `zone_id` before lookup.
    pub fn require(&self, key: &str, zone_id: &str) -> Result<&str> {
        let resolved_key = if key.ends_with('_') {
            format!("{key}{zone_id}")
        } else {
            key.to_string()
        };
        self.values
            .get(&resolved_key)
            .map(String::as_str)
            .ok_or_else(|| ThermostatError::AuthError {
                zone_id: zone_id.to_string(),
                message: format!("required credential '{resolved_key}' is missing"),
            })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_resolves_zone_indexed_key() {
        let mut creds = Credentials::default();
        creds.insert("SHT31_REMOTE_IP_ADDRESS_1", "192.168.86.15");
        assert_eq!(
            creds.require("SHT31_REMOTE_IP_ADDRESS_", "1").unwrap(),
            "192.168.86.15"
        );
    }

    #[test]
    fn require_missing_key_is_auth_error() {
        let creds = Credentials::default();
        let err = creds.require("TCC_USERNAME", "0").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn require_non_indexed_key_ignores_zone() {
        let mut creds = Credentials::default();
        creds.insert("TCC_USERNAME", "me@example.com");
        assert_eq!(creds.require("TCC_USERNAME", "0").unwrap(), "me@example.com");
    }
}
