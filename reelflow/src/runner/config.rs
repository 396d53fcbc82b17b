//! Runner configuration.

use super::InvalidationMap;
use crate::context::keys;
use crate::errors::{ConfigError, ReelflowError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Identifies the quality gate and where it may rewind to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityGateConfig {
    /// Name of the gate step.
    pub step: String,
    /// Default checkpoint the gate rewinds to.
    pub checkpoint: String,
    /// State key the gate writes its retry request to.
    #[serde(default = "default_request_key")]
    pub request_key: String,
}

fn default_request_key() -> String {
    keys::QA_RETRY_REQUEST.name().to_string()
}

impl QualityGateConfig {
    /// Creates a gate configuration using the default request key.
    #[must_use]
    pub fn new(step: impl Into<String>, checkpoint: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            checkpoint: checkpoint.into(),
            request_key: default_request_key(),
        }
    }

    /// Sets the request key.
    #[must_use]
    pub fn with_request_key(mut self, key: impl Into<String>) -> Self {
        self.request_key = key.into();
        self
    }
}

/// Configuration of a [`PipelineRunner`](super::PipelineRunner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Extra attempts a gate may trigger. Zero disables retries.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    /// The designated quality gate, if any.
    #[serde(default)]
    pub quality_gate: Option<QualityGateConfig>,
    /// Whether ephemeral artifacts are removed after a successful run.
    #[serde(default = "default_cleanup_on_success")]
    pub cleanup_on_success: bool,
    /// State owned by each step, cleared on rewinds.
    #[serde(default = "InvalidationMap::well_known")]
    pub invalidation: InvalidationMap,
}

fn default_retry_budget() -> u32 {
    1
}

fn default_cleanup_on_success() -> bool {
    true
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            retry_budget: default_retry_budget(),
            quality_gate: None,
            cleanup_on_success: default_cleanup_on_success(),
            invalidation: InvalidationMap::well_known(),
        }
    }
}

impl RunnerConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ReelflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ReelflowError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    /// Sets the quality gate.
    #[must_use]
    pub fn with_quality_gate(mut self, gate: QualityGateConfig) -> Self {
        self.quality_gate = Some(gate);
        self
    }

    /// Enables or disables the success-path cleanup.
    #[must_use]
    pub fn with_cleanup_on_success(mut self, enabled: bool) -> Self {
        self.cleanup_on_success = enabled;
        self
    }

    /// Replaces the invalidation map.
    #[must_use]
    pub fn with_invalidation(mut self, map: InvalidationMap) -> Self {
        self.invalidation = map;
        self
    }

    /// Total attempts a run may make.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.retry_budget.saturating_add(1)
    }

    /// Validates the configuration on its own, without knowing the steps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(gate) = &self.quality_gate {
            if gate.step.trim().is_empty() {
                return Err(ConfigError::invalid("quality_gate.step", "must not be empty"));
            }
            if gate.checkpoint.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "quality_gate.checkpoint",
                    "must not be empty",
                ));
            }
            if gate.checkpoint == gate.step {
                return Err(ConfigError::invalid(
                    "quality_gate.checkpoint",
                    "must name a step before the gate, not the gate itself",
                ));
            }
            if gate.request_key.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "quality_gate.request_key",
                    "must not be empty",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::catalog;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();

        assert_eq!(config.retry_budget, 1);
        assert_eq!(config.max_attempts(), 2);
        assert!(config.cleanup_on_success);
        assert!(config.quality_gate.is_none());
        assert_eq!(config.invalidation, InvalidationMap::well_known());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = RunnerConfig::from_json_str(
            r#"{
                "retry_budget": 2,
                "quality_gate": {"step": "media_quality_assurance", "checkpoint": "script_generation"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_attempts(), 3);
        let gate = config.quality_gate.unwrap();
        assert_eq!(gate.request_key, "qa_retry_request");
        assert_eq!(gate.checkpoint, catalog::SCRIPT_GENERATION);
        assert!(config.invalidation.contains_step(catalog::VIDEO_GENERATION));
    }

    #[test]
    fn test_from_json_custom_invalidation() {
        let config = RunnerConfig::from_json_str(
            r#"{"retry_budget": 0, "invalidation": {"render": ["frames_*"]}}"#,
        )
        .unwrap();

        assert_eq!(config.max_attempts(), 1);
        assert_eq!(config.invalidation.len(), 1);
    }

    #[test]
    fn test_validate_rejects_self_checkpoint() {
        let config = RunnerConfig::default()
            .with_quality_gate(QualityGateConfig::new("qa", "qa"));

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "quality_gate.checkpoint"
        ));
    }

    #[test]
    fn test_from_json_str_reports_invalid_gate() {
        let err = RunnerConfig::from_json_str(
            r#"{"quality_gate": {"step": "", "checkpoint": "a"}}"#,
        )
        .unwrap_err();

        assert!(matches!(err, ReelflowError::Config(_)));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.json");
        std::fs::write(&path, r#"{"cleanup_on_success": false}"#).unwrap();

        let config = RunnerConfig::from_json_file(&path).unwrap();
        assert!(!config.cleanup_on_success);
        assert_eq!(config.retry_budget, 1);
    }
}
