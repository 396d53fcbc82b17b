//! Step trait and implementations.
//!
//! Steps are the units of work a runner sequences. The runner only knows a
//! step's name and the [`StepResult`] it returns; what the step does with the
//! context in between is its own business.

pub mod catalog;
mod quality_gate;

pub use quality_gate::MediaQualityGate;

use crate::context::PipelineContext;
use crate::core::StepResult;
use async_trait::async_trait;
use std::fmt::Debug;

/// A named unit of work.
///
/// Expected failures (bad input, a rejected upload) are returned as
/// `Ok(StepResult::failure(..))`. An `Err` means the step hit a defect it
/// cannot recover from; the runner aborts the run without retrying.
///
/// A step may run more than once in a run when a quality gate rewinds the
/// pipeline, so re-running it over the same context must be safe.
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Returns the stable name of the step.
    fn step_name(&self) -> &str;

    /// Executes the step against the run context.
    async fn execute(&self, ctx: &mut PipelineContext) -> anyhow::Result<StepResult>;
}

/// A step backed by a synchronous closure.
pub struct FnStep<F>
where
    F: Fn(&mut PipelineContext) -> anyhow::Result<StepResult> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(&mut PipelineContext) -> anyhow::Result<StepResult> + Send + Sync,
{
    /// Creates a new closure step.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStep<F>
where
    F: Fn(&mut PipelineContext) -> anyhow::Result<StepResult> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: Fn(&mut PipelineContext) -> anyhow::Result<StepResult> + Send + Sync,
{
    fn step_name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> anyhow::Result<StepResult> {
        (self.func)(ctx)
    }
}

/// A step that succeeds without touching the context.
#[derive(Debug, Clone)]
pub struct NoOpStep {
    name: String,
}

impl NoOpStep {
    /// Creates a new no-op step.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Step for NoOpStep {
    fn step_name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &mut PipelineContext) -> anyhow::Result<StepResult> {
        Ok(StepResult::ok(&self.name))
    }
}
