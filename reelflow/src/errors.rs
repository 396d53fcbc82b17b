//! Error types for the reelflow runner.
//!
//! Business failures of individual steps are *not* errors in this sense; they
//! travel as [`StepResult`](crate::core::StepResult) values. The types here
//! cover misconfiguration, state access and I/O performed by the core itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for reelflow operations.
#[derive(Debug, Error)]
pub enum ReelflowError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A state bag access failed.
    #[error("{0}")]
    State(#[from] StateError),

    /// The runner configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A run status record could not be persisted or loaded.
    #[error("Status store error: {0}")]
    StatusStore(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-GATE-ORDER").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a pipeline cannot be assembled.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The steps involved in the error.
    pub steps: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            steps: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the steps involved.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Errors raised by typed access to the context state bag.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    /// A required key was never written.
    #[error("State key '{key}' is missing")]
    Missing {
        /// The missing key.
        key: String,
    },

    /// A key holds a value of a different shape than the accessor expects.
    #[error("State key '{key}' has unexpected type: {reason}")]
    TypeMismatch {
        /// The offending key.
        key: String,
        /// Decoder message.
        reason: String,
    },

    /// A value could not be encoded into the bag.
    #[error("State key '{key}' could not be encoded: {reason}")]
    Encode {
        /// The key being written.
        key: String,
        /// Encoder message.
        reason: String,
    },
}

impl StateError {
    /// Creates a missing-key error.
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    /// Creates a type-mismatch error.
    #[must_use]
    pub fn type_mismatch(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading or validating runner configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The pipeline mode string is not one of the known variants.
    #[error("Unknown pipeline mode '{0}' (expected daily, special or test)")]
    UnknownMode(String),

    /// A configuration field holds an invalid value.
    #[error("Invalid configuration for '{field}': {reason}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Why it is invalid.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
