//! Format-specific parameters.

use crate::{Error, Result};
use serde_json::{Map, Value as JsonValue};

/// Format-specific parameters, keyed by name.
///
/// Keys are unconstrained; each codec declares which keys it accepts for
/// loading and for saving, and a request carrying any other key does not
/// match that codec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, JsonValue>);

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Sets a parameter in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Returns a copy without `key`.
    #[must_use]
    pub fn without(&self, key: &str) -> Self {
        let mut copy = self.clone();
        copy.0.remove(key);
        copy
    }

    /// Returns `true` if no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over parameter names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns `true` if every key is in `allowed`.
    #[must_use]
    pub fn keys_within(&self, allowed: &[&str]) -> bool {
        self.keys().all(|key| allowed.contains(&key))
    }

    /// Reads a boolean parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the parameter is present but not a boolean.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.0.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(Error::InvalidInput(format!(
                "parameter '{key}' must be a boolean, got {other}"
            ))),
        }
    }

    /// Reads a non-negative integer parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the parameter is present but not a
    /// non-negative integer.
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.0.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Number(n)) => n.as_u64().map(Some).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "parameter '{key}' must be a non-negative integer, got {n}"
                ))
            }),
            Some(other) => Err(Error::InvalidInput(format!(
                "parameter '{key}' must be an integer, got {other}"
            ))),
        }
    }

    /// Reads a string parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the parameter is present but not a string.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.0.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(Error::InvalidInput(format!(
                "parameter '{key}' must be a string, got {other}"
            ))),
        }
    }
}

impl From<Map<String, JsonValue>> for Params {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, JsonValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, JsonValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
