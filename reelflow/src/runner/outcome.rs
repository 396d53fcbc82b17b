//! The value a run returns to its caller.

use crate::context::PipelineContext;
use crate::core::{PipelineMode, StepResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The part of a step result exposed in the final outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    /// Step name.
    pub step_name: String,
    /// Whether the step succeeded.
    pub success: bool,
    /// Data the step reported.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Paths of the files the step reported.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl From<&StepResult> for StepSnapshot {
    fn from(result: &StepResult) -> Self {
        Self {
            step_name: result.step_name.clone(),
            success: result.success,
            data: result.data.clone(),
            files: result.files_generated.iter().map(|a| a.path.clone()).collect(),
        }
    }
}

/// Final outcome of a run. Every run produces exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Whether every step succeeded.
    pub success: bool,
    /// Run identifier.
    pub run_id: String,
    /// Pipeline mode.
    pub mode: PipelineMode,
    /// Wall time of the run in seconds.
    pub execution_time: f64,
    /// Attempts made, including the last.
    pub attempts: u32,
    /// Snapshots of the step results of the last attempt.
    #[serde(default)]
    pub steps: Vec<StepSnapshot>,
    /// Paths of the persisted artifacts.
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Step that ended a failed run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    /// Error that ended a failed run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineOutcome {
    /// Builds a successful outcome from the finished context.
    #[must_use]
    pub fn success(ctx: &PipelineContext, results: &[StepResult]) -> Self {
        Self {
            success: true,
            run_id: ctx.run_id().to_string(),
            mode: ctx.mode(),
            execution_time: ctx.elapsed_secs(),
            attempts: ctx.attempt(),
            steps: results.iter().map(StepSnapshot::from).collect(),
            artifacts: ctx.persisted_paths().into_iter().map(String::from).collect(),
            failed_step: None,
            error: None,
        }
    }

    /// Minimal failed outcome, used when no failure subscriber responded.
    #[must_use]
    pub fn failure(
        run_id: impl Into<String>,
        mode: PipelineMode,
        failed_step: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            run_id: run_id.into(),
            mode,
            execution_time: 0.0,
            attempts: 0,
            steps: Vec::new(),
            artifacts: Vec::new(),
            failed_step: Some(failed_step.into()),
            error: Some(error.into()),
        }
    }

    /// Failed outcome carrying the timing, attempts and ledger of the context.
    #[must_use]
    pub fn failure_from_context(
        ctx: &PipelineContext,
        failed_step: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            execution_time: ctx.elapsed_secs(),
            attempts: ctx.attempt(),
            artifacts: ctx.persisted_paths().into_iter().map(String::from).collect(),
            ..Self::failure(ctx.run_id(), ctx.mode(), failed_step, error)
        }
    }

    /// Attaches step snapshots.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<StepSnapshot>) -> Self {
        self.steps = steps;
        self
    }

    /// Looks up the snapshot of a step.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepSnapshot> {
        self.steps.iter().find(|s| s.step_name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GeneratedArtifact;
    use serde_json::json;

    #[test]
    fn test_success_outcome() {
        let mut ctx = PipelineContext::with_run_id("r1", PipelineMode::Daily);
        ctx.record_artifact(GeneratedArtifact::persisted("final.mp4"));
        ctx.record_artifact(GeneratedArtifact::new("scratch.wav"));
        let results = vec![
            StepResult::ok("a").with_value("n", json!(1)),
            StepResult::ok("b").with_file(GeneratedArtifact::new("scratch.wav")),
        ];

        let outcome = PipelineOutcome::success(&ctx, &results);

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.artifacts, vec!["final.mp4"]);
        assert_eq!(outcome.step("a").unwrap().data.get("n"), Some(&json!(1)));
        assert!(outcome.step("a").unwrap().files.is_empty());
        assert_eq!(outcome.step("b").unwrap().files, vec!["scratch.wav"]);
        assert!(outcome.failed_step.is_none());
    }

    #[test]
    fn test_failure_fallback() {
        let outcome = PipelineOutcome::failure("r1", PipelineMode::Test, "b", "boom");

        assert!(!outcome.success);
        assert_eq!(outcome.failed_step.as_deref(), Some("b"));
        assert_eq!(outcome.error.as_deref(), Some("boom"));
        assert!(outcome.steps.is_empty());
    }

    #[test]
    fn test_failure_serialization_shape() {
        let ctx = PipelineContext::with_run_id("r9", PipelineMode::Special);
        let outcome = PipelineOutcome::failure_from_context(&ctx, "upload", "quota exceeded");
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["mode"], "special");
        assert_eq!(json["failed_step"], "upload");
        assert_eq!(json["attempts"], 1);
    }
}
