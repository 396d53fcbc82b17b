//! Typed state bag shared by all steps of a run.

use super::StateKey;
use crate::errors::StateError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// The key/value state threaded through a pipeline run.
///
/// Values are stored as JSON so steps can exchange arbitrary outputs. The
/// well-known keys in [`keys`](super::keys) carry their value type, and the
/// typed accessors fail fast when a stored value does not decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateBag {
    values: BTreeMap<String, Value>,
}

impl StateBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a typed value. `Ok(None)` means the key was never written.
    pub fn get<T: DeserializeOwned>(&self, key: &StateKey<T>) -> Result<Option<T>, StateError> {
        self.get_as(key.name())
    }

    /// Reads a typed value that an earlier step promised to write.
    pub fn require<T: DeserializeOwned>(&self, key: &StateKey<T>) -> Result<T, StateError> {
        self.get(key)?.ok_or_else(|| StateError::missing(key.name()))
    }

    /// Writes a typed value, replacing any previous one.
    pub fn set<T: Serialize>(&mut self, key: &StateKey<T>, value: &T) -> Result<(), StateError> {
        let encoded = serde_json::to_value(value).map_err(|e| StateError::Encode {
            key: key.name().to_string(),
            reason: e.to_string(),
        })?;
        self.values.insert(key.name().to_string(), encoded);
        Ok(())
    }

    /// Decodes the value under an arbitrary key.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
        self.values
            .get(key)
            .map(|v| {
                T::deserialize(v).map_err(|e| StateError::type_mismatch(key, e.to_string()))
            })
            .transpose()
    }

    /// Returns the raw JSON value under a key.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Writes a raw JSON value, returning the previous one.
    pub fn set_raw(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Removes every key starting with `prefix`, returning the removed keys.
    pub fn remove_prefix(&mut self, prefix: &str) -> Vec<String> {
        let doomed: Vec<String> = self
            .values
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &doomed {
            self.values.remove(key);
        }
        doomed
    }

    /// Returns all keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a copy of all entries as a JSON object map.
    #[must_use]
    pub fn to_map(&self) -> serde_json::Map<String, Value> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
