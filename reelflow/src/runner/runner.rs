//! Sequential runner with checkpoint retries.

use super::{PipelineOutcome, RunnerConfig, StepSnapshot};
use crate::bus::{FailureBus, FailureEvent, FailureKind, Notifier};
use crate::context::PipelineContext;
use crate::core::{
    purge_artifacts, PipelineMode, RetentionPolicy, RetryCheckpointRequest, StepFault, StepResult,
};
use crate::events::{event_payload, EventSink};
use crate::status::{RunStatus, RunStatusRecord, RunStatusStore};
use crate::steps::Step;
use futures::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the quality gate sits and where its requests are read from.
#[derive(Debug, Clone)]
pub(crate) struct GateBinding {
    pub(crate) index: usize,
    pub(crate) checkpoint: usize,
    pub(crate) request_key: String,
}

/// How one attempt ended.
enum AttemptEnd {
    Completed,
    Rewind(usize),
    Failed(PipelineOutcome),
}

/// Runs a fixed sequence of steps over a [`PipelineContext`].
///
/// Steps execute strictly one after another. When the designated quality
/// gate fails and leaves a [`RetryCheckpointRequest`] in state, the runner
/// clears the state owned by the checkpoint step and everything after it,
/// then starts a new attempt from the checkpoint, up to
/// [`RunnerConfig::max_attempts`] attempts. Every terminal failure goes
/// through the [`FailureBus`] exactly once.
///
/// Build one with [`PipelineBuilder`](super::PipelineBuilder).
pub struct PipelineRunner {
    pub(crate) name: String,
    pub(crate) steps: Vec<Arc<dyn Step>>,
    pub(crate) config: RunnerConfig,
    pub(crate) gate: Option<GateBinding>,
    pub(crate) failure_bus: Arc<FailureBus>,
    pub(crate) event_sink: Arc<dyn EventSink>,
    pub(crate) status_store: Option<Arc<dyn RunStatusStore>>,
    pub(crate) notifier: Option<Arc<dyn Notifier>>,
    pub(crate) retention: Arc<dyn RetentionPolicy>,
}

impl PipelineRunner {
    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step_name()).collect()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Returns the name of the quality gate, if one is configured.
    #[must_use]
    pub fn gate_step(&self) -> Option<&str> {
        self.gate.as_ref().map(|g| self.steps[g.index].step_name())
    }

    /// Returns the checkpoint the quality gate rewinds to by default.
    #[must_use]
    pub fn checkpoint_step(&self) -> Option<&str> {
        self.gate.as_ref().map(|g| self.steps[g.checkpoint].step_name())
    }

    /// Returns the failure bus, e.g. to add subscribers.
    #[must_use]
    pub fn failure_bus(&self) -> &Arc<FailureBus> {
        &self.failure_bus
    }

    /// Runs the pipeline in a fresh context.
    pub async fn run(&self, mode: PipelineMode) -> PipelineOutcome {
        let mut ctx = PipelineContext::new(mode);
        self.run_with_context(&mut ctx).await
    }

    /// Runs the pipeline over a caller-provided context.
    ///
    /// The context is left as the last step saw it, so the caller can
    /// inspect state and the artifact ledger afterwards.
    pub async fn run_with_context(&self, ctx: &mut PipelineContext) -> PipelineOutcome {
        let max_attempts = self.config.max_attempts();
        info!(
            pipeline = %self.name,
            run_id = %ctx.run_id(),
            mode = %ctx.mode(),
            steps = self.steps.len(),
            max_attempts,
            "Pipeline started"
        );
        ctx.set_attempt(1);
        ctx.mark_started();
        self.emit(
            ctx,
            "pipeline.started",
            json!({"pipeline": self.name, "steps": self.step_names(), "max_attempts": max_attempts}),
        )
        .await;
        self.record_status(RunStatusRecord::new(ctx.run_id(), ctx.mode(), RunStatus::Running))
            .await;

        let mut results: Vec<Option<StepResult>> = vec![None; self.steps.len()];
        let mut start_index = 0;
        let mut attempt = 1;

        loop {
            ctx.set_attempt(attempt);
            match self
                .run_attempt(ctx, start_index, max_attempts, &mut results)
                .await
            {
                AttemptEnd::Completed => return self.finish_success(ctx, results).await,
                AttemptEnd::Failed(outcome) => return outcome,
                AttemptEnd::Rewind(checkpoint) => {
                    start_index = checkpoint;
                    attempt += 1;
                }
            }
        }
    }

    async fn run_attempt(
        &self,
        ctx: &mut PipelineContext,
        start_index: usize,
        max_attempts: u32,
        results: &mut [Option<StepResult>],
    ) -> AttemptEnd {
        for index in start_index..self.steps.len() {
            let step = Arc::clone(&self.steps[index]);
            let name = step.step_name().to_string();

            let result = match self.execute_step(step.as_ref(), index, ctx).await {
                Ok(result) => result,
                Err(fault) => {
                    let outcome = self
                        .dispatch_failure(ctx, &name, FailureKind::Fatal, None, Some(fault), results)
                        .await;
                    return AttemptEnd::Failed(outcome);
                }
            };

            ctx.record_artifacts(result.files_generated.iter().cloned(), &name);
            results[index] = Some(result.clone());

            if result.success {
                continue;
            }

            let is_gate = self.gate.as_ref().is_some_and(|g| g.index == index);
            let retry_allowed = ctx.attempt() < max_attempts;
            let request = if is_gate && retry_allowed {
                self.read_request(ctx)
            } else {
                None
            };

            let end = match request {
                Some(Ok((checkpoint, request))) => {
                    self.rewind(ctx, checkpoint, &request, results).await;
                    return AttemptEnd::Rewind(checkpoint);
                }
                Some(Err(reason)) => {
                    let result = StepResult::failure(
                        &name,
                        format!("Invalid retry checkpoint: {reason} ({})", result.error_message()),
                    );
                    self.dispatch_failure(
                        ctx,
                        &name,
                        FailureKind::InvalidCheckpoint,
                        Some(result),
                        None,
                        results,
                    )
                    .await
                }
                None if is_gate && self.has_request(ctx) => {
                    warn!(
                        run_id = %ctx.run_id(),
                        step = %name,
                        attempts = ctx.attempt(),
                        "Quality gate still failing and no attempts left"
                    );
                    self.dispatch_failure(
                        ctx,
                        &name,
                        FailureKind::RetryExhausted,
                        Some(result),
                        None,
                        results,
                    )
                    .await
                }
                None => {
                    self.dispatch_failure(ctx, &name, FailureKind::Business, Some(result), None, results)
                        .await
                }
            };
            return AttemptEnd::Failed(end);
        }

        AttemptEnd::Completed
    }

    /// Executes one step, turning errors and panics into a [`StepFault`].
    async fn execute_step(
        &self,
        step: &dyn Step,
        index: usize,
        ctx: &mut PipelineContext,
    ) -> Result<StepResult, StepFault> {
        let name = step.step_name().to_string();
        debug!(run_id = %ctx.run_id(), step = %name, index, attempt = ctx.attempt(), "Step started");
        self.emit(ctx, "step.started", json!({"step": name, "index": index}))
            .await;

        let started = Instant::now();
        let outcome = AssertUnwindSafe(step.execute(ctx)).catch_unwind().await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let fault = match outcome {
            Ok(Ok(mut result)) => {
                result.duration_ms = duration_ms;
                let result = result.normalize();
                if result.success {
                    debug!(run_id = %ctx.run_id(), step = %name, duration_ms, "Step completed");
                    self.emit(
                        ctx,
                        "step.completed",
                        json!({
                            "step": name,
                            "duration_ms": duration_ms,
                            "files": result.files_generated.len(),
                        }),
                    )
                    .await;
                } else {
                    warn!(
                        run_id = %ctx.run_id(),
                        step = %name,
                        error = %result.error_message(),
                        "Step reported failure"
                    );
                    self.emit(
                        ctx,
                        "step.failed",
                        json!({"step": name, "error": result.error_message(), "fatal": false}),
                    )
                    .await;
                }
                return Ok(result);
            }
            Ok(Err(error)) => StepFault::from(error),
            Err(payload) => StepFault::from_panic(payload.as_ref()),
        };

        warn!(run_id = %ctx.run_id(), step = %name, error = %fault, "Step aborted");
        self.emit(
            ctx,
            "step.failed",
            json!({"step": name, "error": fault.to_string(), "fatal": true}),
        )
        .await;
        Err(fault)
    }

    /// Returns true if the gate left a retry request, readable or not.
    fn has_request(&self, ctx: &PipelineContext) -> bool {
        self.gate
            .as_ref()
            .is_some_and(|g| ctx.state.contains(&g.request_key))
    }

    /// Reads the gate's retry request and resolves its checkpoint index.
    ///
    /// `None` means the gate left no request; `Some(Err)` means the request
    /// cannot be honored.
    fn read_request(
        &self,
        ctx: &PipelineContext,
    ) -> Option<Result<(usize, RetryCheckpointRequest), String>> {
        let gate = self.gate.as_ref()?;
        let request = match ctx.state.get_as::<RetryCheckpointRequest>(&gate.request_key) {
            Ok(Some(request)) => request,
            Ok(None) => return None,
            Err(e) => return Some(Err(e.to_string())),
        };

        let checkpoint = self.steps[..gate.index]
            .iter()
            .position(|s| s.step_name() == request.start_step);
        Some(match checkpoint {
            Some(checkpoint) => Ok((checkpoint, request)),
            None => Err(format!(
                "'{}' is not a step before '{}'",
                request.start_step,
                self.steps[gate.index].step_name()
            )),
        })
    }

    /// Discards the state and results of the checkpoint and every later step.
    async fn rewind(
        &self,
        ctx: &mut PipelineContext,
        checkpoint: usize,
        request: &RetryCheckpointRequest,
        results: &mut [Option<StepResult>],
    ) {
        let owners = self.steps[checkpoint..].iter().map(|s| s.step_name());
        let cleared = self.config.invalidation.invalidate(owners, &mut ctx.state);
        if let Some(gate) = &self.gate {
            ctx.state.remove(&gate.request_key);
        }
        for slot in &mut results[checkpoint..] {
            *slot = None;
        }

        info!(
            run_id = %ctx.run_id(),
            checkpoint = %request.start_step,
            reason = %request.reason,
            attempt = ctx.attempt(),
            next_attempt = ctx.attempt() + 1,
            cleared = cleared.len(),
            "Rewinding pipeline to checkpoint"
        );
        self.emit(
            ctx,
            "pipeline.retry",
            json!({
                "checkpoint": request.start_step,
                "reason": request.reason,
                "next_attempt": ctx.attempt() + 1,
                "cleared_keys": cleared,
            }),
        )
        .await;
    }

    /// Sends a terminal failure through the bus and returns the outcome it produced.
    async fn dispatch_failure(
        &self,
        ctx: &PipelineContext,
        step_name: &str,
        kind: FailureKind,
        result: Option<StepResult>,
        fault: Option<StepFault>,
        results: &[Option<StepResult>],
    ) -> PipelineOutcome {
        let mut event = FailureEvent::new(step_name, kind)
            .with_context(ctx)
            .with_steps(snapshots(results));
        if let Some(result) = result {
            event = event.with_result(result);
        }
        if let Some(fault) = fault {
            event = event.with_error(fault);
        }

        let mut outcome = self.failure_bus.notify(event).await.into_outcome();
        if outcome.success {
            warn!(run_id = %ctx.run_id(), "Failure subscriber reported success; overriding");
            outcome.success = false;
        }

        self.emit(
            ctx,
            "pipeline.failed",
            json!({
                "failed_step": outcome.failed_step,
                "kind": kind,
                "error": outcome.error,
            }),
        )
        .await;
        outcome
    }

    async fn finish_success(
        &self,
        ctx: &PipelineContext,
        results: Vec<Option<StepResult>>,
    ) -> PipelineOutcome {
        if self.config.cleanup_on_success {
            let report = purge_artifacts(ctx.artifacts(), self.retention.as_ref()).await;
            if !report.is_clean() {
                warn!(run_id = %ctx.run_id(), failed = ?report.failed, "Some ephemeral artifacts could not be removed");
            }
        }

        let results: Vec<StepResult> = results.into_iter().flatten().collect();
        let outcome = PipelineOutcome::success(ctx, &results);

        self.record_status(
            RunStatusRecord::new(ctx.run_id(), ctx.mode(), RunStatus::Succeeded)
                .with_attempt(ctx.attempt()),
        )
        .await;
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify_success(&outcome).await {
                warn!(run_id = %ctx.run_id(), error = %e, "Success notification was not delivered");
            }
        }

        info!(
            pipeline = %self.name,
            run_id = %ctx.run_id(),
            attempts = outcome.attempts,
            execution_time = outcome.execution_time,
            "Pipeline completed"
        );
        self.emit(
            ctx,
            "pipeline.completed",
            json!({"execution_time": outcome.execution_time, "attempts": outcome.attempts}),
        )
        .await;
        outcome
    }

    async fn record_status(&self, record: RunStatusRecord) {
        if let Some(store) = &self.status_store {
            let run_id = record.run_id.clone();
            if let Err(e) = store.record(record).await {
                warn!(run_id = %run_id, error = %e, "Failed to record run status");
            }
        }
    }

    async fn emit(&self, ctx: &PipelineContext, event_type: &str, extra: serde_json::Value) {
        self.event_sink
            .emit(event_type, event_payload(ctx, extra))
            .await;
    }
}

fn snapshots(results: &[Option<StepResult>]) -> Vec<StepSnapshot> {
    results.iter().flatten().map(StepSnapshot::from).collect()
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .field("config", &self.config)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
