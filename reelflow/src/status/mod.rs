//! Run status persistence.
//!
//! The runner records a [`RunStatusRecord`] when a run starts and when it
//! ends. Stores are collaborators: a failing store is logged by the caller
//! and never changes the outcome of a run.

mod store;

pub use store::{InMemoryStatusStore, JsonFileStatusStore, RunStatusStore};

use crate::core::PipelineMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run is executing.
    Running,
    /// The run finished successfully.
    Succeeded,
    /// The run ended with a terminal failure.
    Failed,
}

impl RunStatus {
    /// Returns true for the end states.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The persisted status of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatusRecord {
    /// Run identifier.
    pub run_id: String,
    /// Pipeline mode.
    pub mode: PipelineMode,
    /// Current status.
    pub status: RunStatus,
    /// Attempt the status was recorded in.
    pub attempt: u32,
    /// Failing step, for failed runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    /// Error message, for failed runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the record was written (ISO 8601).
    pub updated_at: String,
}

impl RunStatusRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(run_id: impl Into<String>, mode: PipelineMode, status: RunStatus) -> Self {
        Self {
            run_id: run_id.into(),
            mode,
            status,
            attempt: 1,
            failed_step: None,
            error: None,
            updated_at: crate::utils::iso_timestamp(),
        }
    }

    /// Sets the attempt.
    #[must_use]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Attaches failure details.
    #[must_use]
    pub fn with_failure(mut self, step: impl Into<String>, error: impl Into<String>) -> Self {
        self.failed_step = Some(step.into());
        self.error = Some(error.into());
        self
    }
}
