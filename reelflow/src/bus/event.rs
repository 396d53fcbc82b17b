//! The failure event passed through the bus.

use crate::context::PipelineContext;
use crate::core::{PipelineMode, StepFault, StepResult};
use crate::runner::{PipelineOutcome, StepSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A step returned a failed result.
    Business,
    /// A step returned an error or panicked.
    Fatal,
    /// The gate kept failing until the retry budget ran out.
    RetryExhausted,
    /// The gate asked to resume from a step that cannot be a checkpoint.
    InvalidCheckpoint,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Business => write!(f, "business"),
            Self::Fatal => write!(f, "fatal"),
            Self::RetryExhausted => write!(f, "retry_exhausted"),
            Self::InvalidCheckpoint => write!(f, "invalid_checkpoint"),
        }
    }
}

/// A terminal failure, handed to every subscriber in turn.
///
/// Subscribers may set [`response`](Self::response); the runner returns
/// whatever the last writer left there.
#[derive(Debug)]
pub struct FailureEvent<'a> {
    /// Step that ended the run.
    pub step_name: String,
    /// Failure category.
    pub kind: FailureKind,
    /// The run context, read-only.
    pub context: Option<&'a PipelineContext>,
    /// The failed result, for business failures.
    pub result: Option<StepResult>,
    /// The fault, for fatal failures.
    pub error: Option<StepFault>,
    /// Snapshots of the steps that completed in the last attempt.
    pub steps: Vec<StepSnapshot>,
    /// Outcome to hand back to the caller.
    pub response: Option<PipelineOutcome>,
}

impl<'a> FailureEvent<'a> {
    /// Creates an event with no context, result or fault attached.
    #[must_use]
    pub fn new(step_name: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            step_name: step_name.into(),
            kind,
            context: None,
            result: None,
            error: None,
            steps: Vec::new(),
            response: None,
        }
    }

    /// Attaches the run context.
    #[must_use]
    pub fn with_context(mut self, ctx: &'a PipelineContext) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Attaches the failed result.
    #[must_use]
    pub fn with_result(mut self, result: StepResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Attaches the fault.
    #[must_use]
    pub fn with_error(mut self, error: StepFault) -> Self {
        self.error = Some(error);
        self
    }

    /// Attaches the completed step snapshots.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<StepSnapshot>) -> Self {
        self.steps = steps;
        self
    }

    /// Describes the failure: the fault if any, else the result's error.
    #[must_use]
    pub fn error_message(&self) -> String {
        if let Some(fault) = &self.error {
            return fault.to_string();
        }
        match &self.result {
            Some(result) if !result.error_message().is_empty() => result.error_message().to_string(),
            _ => format!("Step '{}' failed ({})", self.step_name, self.kind),
        }
    }

    /// Returns the run id, if a context is attached.
    #[must_use]
    pub fn run_id(&self) -> Option<&str> {
        self.context.map(PipelineContext::run_id)
    }

    /// Returns the run mode, if a context is attached.
    #[must_use]
    pub fn mode(&self) -> Option<PipelineMode> {
        self.context.map(PipelineContext::mode)
    }

    /// Returns the outcome subscribers produced, or the minimal fallback.
    #[must_use]
    pub fn into_outcome(self) -> PipelineOutcome {
        let error = self.error_message();
        if let Some(response) = self.response {
            return response;
        }
        match self.context {
            Some(ctx) => PipelineOutcome::failure_from_context(ctx, self.step_name, error)
                .with_steps(self.steps),
            None => PipelineOutcome::failure("", PipelineMode::default(), self.step_name, error),
        }
    }
}
