//! State invalidation for checkpoint rewinds.

use crate::context::StateBag;
use crate::steps::catalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A state key, or a family of keys sharing a prefix.
///
/// Written as a plain string; a trailing `*` marks a prefix (`broll_*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KeyPattern {
    /// Exactly this key.
    Exact(String),
    /// Every key starting with this prefix.
    Prefix(String),
}

impl KeyPattern {
    /// Parses a pattern string.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    /// Checks if a key is covered by the pattern.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == key,
            Self::Prefix(prefix) => key.starts_with(prefix.as_str()),
        }
    }

    /// Removes every covered key from `state`, returning the removed keys.
    pub fn clear(&self, state: &mut StateBag) -> Vec<String> {
        match self {
            Self::Exact(key) => state
                .remove(key)
                .map(|_| vec![key.clone()])
                .unwrap_or_default(),
            Self::Prefix(prefix) => state.remove_prefix(prefix),
        }
    }
}

impl From<String> for KeyPattern {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for KeyPattern {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<KeyPattern> for String {
    fn from(value: KeyPattern) -> Self {
        value.to_string()
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(key) => f.write_str(key),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// Maps each step name to the state it owns.
///
/// When a gate rewinds the run to a checkpoint, the runner clears the keys
/// owned by the checkpoint step and by every step after it, so the re-run
/// steps cannot observe stale outputs of the rejected attempt. Steps absent
/// from the map own nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvalidationMap {
    entries: BTreeMap<String, Vec<KeyPattern>>,
}

impl InvalidationMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map of the standard production steps.
    #[must_use]
    pub fn well_known() -> Self {
        catalog::STEPS.iter().fold(Self::new(), |map, contract| {
            map.with_step(contract.name, contract.invalidates.iter().copied())
        })
    }

    /// Declares the keys owned by a step, replacing any earlier declaration.
    #[must_use]
    pub fn with_step<I, P>(mut self, step: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPattern>,
    {
        self.insert(step, patterns);
        self
    }

    /// Declares the keys owned by a step, replacing any earlier declaration.
    pub fn insert<I, P>(&mut self, step: impl Into<String>, patterns: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPattern>,
    {
        self.entries
            .insert(step.into(), patterns.into_iter().map(Into::into).collect());
    }

    /// Returns the patterns owned by a step.
    #[must_use]
    pub fn patterns_for(&self, step: &str) -> &[KeyPattern] {
        self.entries.get(step).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns true if the map declares the step.
    #[must_use]
    pub fn contains_step(&self, step: &str) -> bool {
        self.entries.contains_key(step)
    }

    /// Returns the number of declared steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no step is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears the state owned by every step in `steps`, returning the removed keys.
    pub fn invalidate<'a>(
        &self,
        steps: impl IntoIterator<Item = &'a str>,
        state: &mut StateBag,
    ) -> Vec<String> {
        let mut removed = Vec::new();
        for step in steps {
            for pattern in self.patterns_for(step) {
                removed.extend(pattern.clear(state));
            }
        }
        removed
    }
}
