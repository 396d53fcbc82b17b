//! Pipeline builder with validation.

use super::runner::GateBinding;
use super::{PipelineRunner, RunnerConfig};
use crate::bus::{FailureBus, Notifier};
use crate::core::{PersistedOnly, RetentionPolicy};
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events::{EventSink, NoOpEventSink};
use crate::status::RunStatusStore;
use crate::steps::Step;
use std::sync::Arc;

/// Builder for creating validated runners.
///
/// Steps run in the order they are added. Collaborators left unset fall
/// back to no-op or default implementations; the failure bus defaults to
/// [`FailureBus::standard`] wired with the builder's own collaborators.
pub struct PipelineBuilder {
    name: String,
    steps: Vec<Arc<dyn Step>>,
    config: RunnerConfig,
    failure_bus: Option<Arc<FailureBus>>,
    event_sink: Arc<dyn EventSink>,
    status_store: Option<Arc<dyn RunStatusStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    retention: Arc<dyn RetentionPolicy>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            config: RunnerConfig::default(),
            failure_bus: None,
            event_sink: Arc::new(NoOpEventSink),
            status_store: None,
            notifier: None,
            retention: Arc::new(PersistedOnly),
        }
    }

    /// Appends a step.
    ///
    /// # Errors
    ///
    /// Returns an error if the step name is empty or already taken.
    pub fn step(mut self, step: Arc<dyn Step>) -> Result<Self, PipelineValidationError> {
        let name = step.step_name().to_string();

        if name.trim().is_empty() {
            return Err(PipelineValidationError::new("Step name cannot be empty")
                .with_error_info(
                    ContractErrorInfo::new("CONTRACT-STEP-NAME", "Empty step name")
                        .with_fix_hint("Give every step a stable, non-empty name."),
                ));
        }

        if self.steps.iter().any(|s| s.step_name() == name) {
            return Err(PipelineValidationError::new(format!(
                "Step '{name}' is already part of pipeline '{}'",
                self.name
            ))
            .with_steps(vec![name.clone()])
            .with_error_info(
                ContractErrorInfo::new(
                    "CONTRACT-DUPLICATE-STEP",
                    format!("Duplicate step name '{name}'"),
                )
                .with_fix_hint("Step names are used as checkpoints and must be unique."),
            ));
        }

        self.steps.push(step);
        Ok(self)
    }

    /// Appends several steps in order.
    ///
    /// # Errors
    ///
    /// Returns the first validation error.
    pub fn steps(
        self,
        steps: impl IntoIterator<Item = Arc<dyn Step>>,
    ) -> Result<Self, PipelineValidationError> {
        steps.into_iter().try_fold(self, Self::step)
    }

    /// Sets the runner configuration.
    #[must_use]
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default failure bus.
    #[must_use]
    pub fn with_failure_bus(mut self, bus: Arc<FailureBus>) -> Self {
        self.failure_bus = Some(bus);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the run status store.
    #[must_use]
    pub fn with_status_store(mut self, store: Arc<dyn RunStatusStore>) -> Self {
        self.status_store = Some(store);
        self
    }

    /// Sets the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the retention policy.
    #[must_use]
    pub fn with_retention(mut self, policy: Arc<dyn RetentionPolicy>) -> Self {
        self.retention = policy;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Builds the runner.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline is empty, the configuration is
    /// invalid, or the quality gate and its checkpoint are not steps of the
    /// pipeline in the right order.
    pub fn build(self) -> Result<PipelineRunner, PipelineValidationError> {
        if self.steps.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no steps").with_error_info(
                ContractErrorInfo::new("CONTRACT-EMPTY", "Cannot build an empty pipeline")
                    .with_fix_hint("Add at least one step to the pipeline before building."),
            ));
        }

        if let Err(e) = self.config.validate() {
            return Err(PipelineValidationError::new(e.to_string()).with_error_info(
                ContractErrorInfo::new("CONTRACT-CONFIG", "Invalid runner configuration"),
            ));
        }

        let gate = self.bind_gate()?;

        let failure_bus = self.failure_bus.unwrap_or_else(|| {
            Arc::new(FailureBus::standard(
                self.status_store.clone(),
                self.notifier.clone(),
                Arc::clone(&self.retention),
            ))
        });

        Ok(PipelineRunner {
            name: self.name,
            steps: self.steps,
            config: self.config,
            gate,
            failure_bus,
            event_sink: self.event_sink,
            status_store: self.status_store,
            notifier: self.notifier,
            retention: self.retention,
        })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.step_name() == name)
    }

    fn bind_gate(&self) -> Result<Option<GateBinding>, PipelineValidationError> {
        let Some(gate) = &self.config.quality_gate else {
            return Ok(None);
        };

        let Some(index) = self.position(&gate.step) else {
            return Err(PipelineValidationError::new(format!(
                "Quality gate '{}' is not a step of pipeline '{}'",
                gate.step, self.name
            ))
            .with_steps(vec![gate.step.clone()])
            .with_error_info(
                ContractErrorInfo::new("CONTRACT-GATE-MISSING", "Unknown quality gate step")
                    .with_fix_hint("Add the gate step or fix quality_gate.step."),
            ));
        };

        match self.position(&gate.checkpoint) {
            Some(checkpoint) if checkpoint < index => Ok(Some(GateBinding {
                index,
                checkpoint,
                request_key: gate.request_key.clone(),
            })),
            Some(checkpoint) => Err(PipelineValidationError::new(format!(
                "Checkpoint '{}' must run before quality gate '{}'",
                gate.checkpoint, gate.step
            ))
            .with_steps(vec![gate.checkpoint.clone(), gate.step.clone()])
            .with_error_info(
                ContractErrorInfo::new("CONTRACT-GATE-ORDER", "Checkpoint is not before the gate")
                    .with_fix_hint("Pick a checkpoint that appears earlier in the pipeline.")
                    .with_context_entry("checkpoint_index", checkpoint.to_string())
                    .with_context_entry("gate_index", index.to_string()),
            )),
            None => Err(PipelineValidationError::new(format!(
                "Checkpoint '{}' is not a step of pipeline '{}'",
                gate.checkpoint, self.name
            ))
            .with_steps(vec![gate.checkpoint.clone()])
            .with_error_info(
                ContractErrorInfo::new("CONTRACT-CHECKPOINT-MISSING", "Unknown checkpoint step")
                    .with_fix_hint("Add the checkpoint step or fix quality_gate.checkpoint."),
            )),
        }
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
