//! The mutable context threaded through a pipeline run.

use super::StateBag;
use crate::core::{GeneratedArtifact, PipelineMode};
use crate::utils::generate_run_id;
use chrono::{DateTime, Utc};
use std::time::Instant;

/// Everything a run carries from one step to the next.
///
/// The context is owned by a single run and mutated in place by each step.
/// It holds the run identity, the state bag, and the artifact ledger. The
/// ledger has at most one entry per path; reporting a path twice merges the
/// entries instead of duplicating them.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    run_id: String,
    mode: PipelineMode,
    /// Key/value state shared by all steps.
    pub state: StateBag,
    artifacts: Vec<GeneratedArtifact>,
    attempt: u32,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl PipelineContext {
    /// Creates a context with a fresh run id.
    #[must_use]
    pub fn new(mode: PipelineMode) -> Self {
        Self::with_run_id(generate_run_id(), mode)
    }

    /// Creates a context with a caller-chosen run id.
    #[must_use]
    pub fn with_run_id(run_id: impl Into<String>, mode: PipelineMode) -> Self {
        Self {
            run_id: run_id.into(),
            mode,
            state: StateBag::new(),
            artifacts: Vec::new(),
            attempt: 1,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Seeds the state bag before the run starts.
    #[must_use]
    pub fn with_state(mut self, state: StateBag) -> Self {
        self.state = state;
        self
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Returns the mode the run was started in.
    #[must_use]
    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    /// Returns the current attempt, starting at 1.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub(crate) fn set_attempt(&mut self, attempt: u32) {
        self.attempt = attempt;
    }

    /// Restarts the run clock. The runner calls this when a run begins.
    pub(crate) fn mark_started(&mut self) {
        self.started_at = Utc::now();
        self.started = Instant::now();
    }

    /// Returns when the run started, or when the context was created if
    /// no run has started yet.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Seconds elapsed since [`started_at`](Self::started_at).
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Adds an artifact to the ledger.
    ///
    /// Returns true if the path was new. A known path is merged into the
    /// existing entry, and a persisted entry stays persisted.
    pub fn record_artifact(&mut self, artifact: GeneratedArtifact) -> bool {
        match self.artifacts.iter_mut().find(|a| a.path == artifact.path) {
            Some(existing) => {
                existing.absorb(artifact);
                false
            }
            None => {
                self.artifacts.push(artifact);
                true
            }
        }
    }

    /// Records every artifact a step reported, filling in the source step
    /// where the step left it empty.
    pub fn record_artifacts(
        &mut self,
        artifacts: impl IntoIterator<Item = GeneratedArtifact>,
        source_step: &str,
    ) {
        for mut artifact in artifacts {
            if artifact.source_step.is_none() {
                artifact.source_step = Some(source_step.to_string());
            }
            self.record_artifact(artifact);
        }
    }

    /// Looks up the ledger entry for a path.
    #[must_use]
    pub fn artifact(&self, path: &str) -> Option<&GeneratedArtifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    /// Flags a ledger entry as persisted. Returns false for unknown paths.
    pub fn mark_persisted(&mut self, path: &str) -> bool {
        match self.artifacts.iter_mut().find(|a| a.path == path) {
            Some(artifact) => {
                artifact.mark_persisted();
                true
            }
            None => false,
        }
    }

    /// Returns the artifact ledger in recording order.
    #[must_use]
    pub fn artifacts(&self) -> &[GeneratedArtifact] {
        &self.artifacts
    }

    /// Returns the paths of all persisted artifacts.
    #[must_use]
    pub fn persisted_paths(&self) -> Vec<&str> {
        self.artifacts
            .iter()
            .filter(|a| a.is_persisted())
            .map(|a| a.path.as_str())
            .collect()
    }
}
