//! Step result type returned by every step.

use super::GeneratedArtifact;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The outcome of a single step execution.
///
/// A failed result always carries a non-empty error and no data; the
/// constructors enforce this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Whether the step completed its work.
    pub success: bool,

    /// Name of the step that produced this result.
    pub step_name: String,

    /// Step outputs. Merged into the context by the step itself, never by the runner.
    #[serde(default)]
    pub data: Map<String, Value>,

    /// Human readable error for failed results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Files produced by the step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_generated: Vec<GeneratedArtifact>,

    /// Wall time spent in `execute`, filled by the runner.
    #[serde(default)]
    pub duration_ms: f64,
}

impl StepResult {
    /// Creates a successful result with no data.
    #[must_use]
    pub fn ok(step_name: impl Into<String>) -> Self {
        Self {
            success: true,
            step_name: step_name.into(),
            data: Map::new(),
            error: None,
            files_generated: Vec::new(),
            duration_ms: 0.0,
        }
    }

    /// Creates a successful result with data.
    #[must_use]
    pub fn ok_with(step_name: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            data,
            ..Self::ok(step_name)
        }
    }

    /// Creates a failed result.
    ///
    /// An empty error message is replaced so the failure stays diagnosable.
    #[must_use]
    pub fn failure(step_name: impl Into<String>, error: impl Into<String>) -> Self {
        let step_name = step_name.into();
        let mut error = error.into();
        if error.trim().is_empty() {
            error = format!("Step '{step_name}' failed without an error message");
        }
        Self {
            success: false,
            step_name,
            data: Map::new(),
            error: Some(error),
            files_generated: Vec::new(),
            duration_ms: 0.0,
        }
    }

    /// Adds a single data entry.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Adds a generated file.
    #[must_use]
    pub fn with_file(mut self, artifact: GeneratedArtifact) -> Self {
        self.files_generated.push(artifact);
        self
    }

    /// Adds several generated files.
    #[must_use]
    pub fn with_files(mut self, artifacts: impl IntoIterator<Item = GeneratedArtifact>) -> Self {
        self.files_generated.extend(artifacts);
        self
    }

    /// Returns the error message, or an empty string for successful results.
    #[must_use]
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }

    /// Restores the failure invariant on a hand-built result.
    pub(crate) fn normalize(mut self) -> Self {
        if !self.success {
            let missing = self.error.as_deref().map_or(true, |e| e.trim().is_empty());
            if missing {
                self.error = Some(format!(
                    "Step '{}' failed without an error message",
                    self.step_name
                ));
            }
        }
        self
    }
}

/// An unexpected defect raised by a step.
///
/// Faults are never retried: the runner aborts the whole pipeline and sends
/// the fault through the failure bus.
#[derive(Debug, Error)]
pub enum StepFault {
    /// The step returned an error instead of a result.
    #[error("{0:#}")]
    Error(#[from] anyhow::Error),

    /// The step panicked.
    #[error("step panicked: {0}")]
    Panicked(String),
}

impl StepFault {
    /// Builds a fault from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_result() {
        let result = StepResult::ok("news_collection").with_value("count", json!(3));

        assert!(result.success);
        assert_eq!(result.step_name, "news_collection");
        assert_eq!(result.data.get("count"), Some(&json!(3)));
        assert_eq!(result.error_message(), "");
    }

    #[test]
    fn test_failure_result() {
        let result = StepResult::failure("audio_synthesis", "voice quota exceeded");

        assert!(!result.success);
        assert!(result.data.is_empty());
        assert_eq!(result.error_message(), "voice quota exceeded");
    }

    #[test]
    fn test_failure_with_empty_error_is_described() {
        let result = StepResult::failure("video_generation", "  ");
        assert!(result.error_message().contains("video_generation"));
    }

    #[test]
    fn test_normalize_fills_missing_error() {
        let mut result = StepResult::ok("gate");
        result.success = false;

        let result = result.normalize();
        assert!(!result.error_message().is_empty());
    }

    #[test]
    fn test_with_files() {
        let result = StepResult::ok("subtitle_alignment").with_files([
            GeneratedArtifact::new("subs.srt"),
            GeneratedArtifact::new("subs.json"),
        ]);
        assert_eq!(result.files_generated.len(), 2);
    }

    #[test]
    fn test_fault_messages() {
        let fault = StepFault::from(anyhow::anyhow!("renderer crashed"));
        assert_eq!(fault.to_string(), "renderer crashed");

        let payload: Box<dyn std::any::Any + Send> = Box::new("index out of bounds");
        let fault = StepFault::from_panic(payload.as_ref());
        assert_eq!(fault.to_string(), "step panicked: index out of bounds");
    }
}
