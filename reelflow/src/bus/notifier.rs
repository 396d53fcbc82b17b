//! External notification of run outcomes.

use super::FailureKind;
use crate::core::PipelineMode;
use crate::runner::PipelineOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Summary of a terminal failure handed to a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNotice {
    /// Run identifier.
    pub run_id: String,
    /// Pipeline mode.
    pub mode: PipelineMode,
    /// Step that ended the run.
    pub step_name: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Error message.
    pub error: String,
    /// Attempt the failure happened in.
    pub attempt: u32,
}

/// Tells someone outside the process how a run ended (chat, e-mail, pager).
///
/// Errors are reported back to the caller, which logs them; a notifier can
/// never change the outcome of a run.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announces a successful run.
    async fn notify_success(&self, outcome: &PipelineOutcome) -> anyhow::Result<()>;

    /// Announces a failed run.
    async fn notify_failure(&self, notice: &FailureNotice) -> anyhow::Result<()>;
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_success(&self, outcome: &PipelineOutcome) -> anyhow::Result<()> {
        info!(
            run_id = %outcome.run_id,
            mode = %outcome.mode,
            attempts = outcome.attempts,
            execution_time = outcome.execution_time,
            "Pipeline succeeded"
        );
        Ok(())
    }

    async fn notify_failure(&self, notice: &FailureNotice) -> anyhow::Result<()> {
        warn!(
            run_id = %notice.run_id,
            mode = %notice.mode,
            step = %notice.step_name,
            kind = %notice.kind,
            attempt = notice.attempt,
            error = %notice.error,
            "Pipeline failed"
        );
        Ok(())
    }
}
