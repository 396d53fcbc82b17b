//! The standard failure subscribers.

use super::{FailureEvent, FailureNotice, FailureSubscriber, Notifier};
use crate::core::{purge_artifacts, RetentionPolicy};
use crate::runner::PipelineOutcome;
use crate::status::{RunStatus, RunStatusRecord, RunStatusStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Logs every terminal failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSubscriber;

#[async_trait]
impl FailureSubscriber for LoggingSubscriber {
    async fn on_failure(&self, event: &mut FailureEvent<'_>) {
        error!(
            run_id = event.run_id().unwrap_or_default(),
            step = %event.step_name,
            kind = %event.kind,
            attempt = event.context.map_or(0, |c| c.attempt()),
            error = %event.error_message(),
            "Pipeline step failed terminally"
        );
    }
}

/// Builds the failed [`PipelineOutcome`] and records the failed run status.
#[derive(Default)]
pub struct FailureResponder {
    status_store: Option<Arc<dyn RunStatusStore>>,
}

impl FailureResponder {
    /// Creates a responder without status persistence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists the failed status through `store`.
    #[must_use]
    pub fn with_status_store(mut self, store: Arc<dyn RunStatusStore>) -> Self {
        self.status_store = Some(store);
        self
    }
}

impl std::fmt::Debug for FailureResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureResponder")
            .field("has_status_store", &self.status_store.is_some())
            .finish()
    }
}

#[async_trait]
impl FailureSubscriber for FailureResponder {
    async fn on_failure(&self, event: &mut FailureEvent<'_>) {
        let error = event.error_message();
        let Some(ctx) = event.context else {
            event.response = Some(PipelineOutcome::failure(
                "",
                crate::core::PipelineMode::default(),
                &event.step_name,
                error,
            ));
            return;
        };

        event.response = Some(
            PipelineOutcome::failure_from_context(ctx, &event.step_name, &error)
                .with_steps(event.steps.clone()),
        );

        if let Some(store) = &self.status_store {
            let record = RunStatusRecord::new(ctx.run_id(), ctx.mode(), RunStatus::Failed)
                .with_attempt(ctx.attempt())
                .with_failure(&event.step_name, error);
            if let Err(e) = store.record(record).await {
                warn!(run_id = %ctx.run_id(), error = %e, "Failed to record run status");
            }
        }
    }
}

/// Forwards failures to a [`Notifier`].
pub struct NotifierSubscriber {
    notifier: Arc<dyn Notifier>,
}

impl NotifierSubscriber {
    /// Creates a subscriber for `notifier`.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

impl std::fmt::Debug for NotifierSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierSubscriber").finish_non_exhaustive()
    }
}

#[async_trait]
impl FailureSubscriber for NotifierSubscriber {
    async fn on_failure(&self, event: &mut FailureEvent<'_>) {
        let notice = FailureNotice {
            run_id: event.run_id().unwrap_or_default().to_string(),
            mode: event.mode().unwrap_or_default(),
            step_name: event.step_name.clone(),
            kind: event.kind,
            error: event.error_message(),
            attempt: event.context.map_or(0, |c| c.attempt()),
        };
        if let Err(e) = self.notifier.notify_failure(&notice).await {
            warn!(run_id = %notice.run_id, error = %e, "Failure notification was not delivered");
        }
    }
}

/// Runs the retention pass over the ledger of the failed run.
#[derive(Debug)]
pub struct ArtifactCleanupSubscriber {
    policy: Arc<dyn RetentionPolicy>,
}

impl ArtifactCleanupSubscriber {
    /// Creates a subscriber applying `policy`.
    #[must_use]
    pub fn new(policy: Arc<dyn RetentionPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl FailureSubscriber for ArtifactCleanupSubscriber {
    async fn on_failure(&self, event: &mut FailureEvent<'_>) {
        let Some(ctx) = event.context else {
            return;
        };
        let report = purge_artifacts(ctx.artifacts(), self.policy.as_ref()).await;
        if report.is_clean() {
            info!(
                run_id = %ctx.run_id(),
                deleted = report.deleted.len(),
                missing = report.missing.len(),
                "Cleaned up artifacts of failed run"
            );
        } else {
            warn!(
                run_id = %ctx.run_id(),
                failed = ?report.failed,
                "Some artifacts of the failed run could not be removed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FailureKind;
    use crate::context::PipelineContext;
    use crate::core::{GeneratedArtifact, PersistedOnly, PipelineMode, StepResult};
    use crate::status::InMemoryStatusStore;
    use crate::testing::RecordingNotifier;

    #[tokio::test]
    async fn test_responder_builds_outcome_and_status() {
        let store = Arc::new(InMemoryStatusStore::new());
        let responder = FailureResponder::new().with_status_store(store.clone());
        let ctx = PipelineContext::with_run_id("r1", PipelineMode::Daily);
        let mut event = FailureEvent::new("upload", FailureKind::Business)
            .with_context(&ctx)
            .with_result(StepResult::failure("upload", "quota exceeded"));

        responder.on_failure(&mut event).await;

        let outcome = event.response.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.failed_step.as_deref(), Some("upload"));
        let record = store.latest("r1").unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn test_responder_without_context() {
        let mut event = FailureEvent::new("a", FailureKind::Fatal);
        FailureResponder::new().on_failure(&mut event).await;

        assert_eq!(event.response.unwrap().failed_step.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_notifier_subscriber_forwards_notice() {
        let notifier = Arc::new(RecordingNotifier::new());
        let subscriber = NotifierSubscriber::new(notifier.clone());
        let ctx = PipelineContext::with_run_id("r1", PipelineMode::Special);
        let mut event = FailureEvent::new("render", FailureKind::RetryExhausted).with_context(&ctx);

        subscriber.on_failure(&mut event).await;

        let notices = notifier.failures();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, FailureKind::RetryExhausted);
        assert_eq!(notices[0].mode, PipelineMode::Special);
    }

    #[tokio::test]
    async fn test_notifier_errors_are_swallowed() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let subscriber = NotifierSubscriber::new(notifier.clone());
        let mut event = FailureEvent::new("render", FailureKind::Fatal);

        subscriber.on_failure(&mut event).await;

        assert_eq!(notifier.failures().len(), 1);
        assert!(event.response.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_subscriber_keeps_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("scratch.wav");
        let keep = dir.path().join("final.mp4");
        std::fs::write(&scratch, b"x").unwrap();
        std::fs::write(&keep, b"y").unwrap();

        let mut ctx = PipelineContext::with_run_id("r1", PipelineMode::Test);
        ctx.record_artifact(GeneratedArtifact::new(&scratch));
        ctx.record_artifact(GeneratedArtifact::persisted(&keep));

        let subscriber = ArtifactCleanupSubscriber::new(Arc::new(PersistedOnly));
        let mut event = FailureEvent::new("render", FailureKind::Fatal).with_context(&ctx);
        subscriber.on_failure(&mut event).await;

        assert!(!scratch.exists());
        assert!(keep.exists());
    }
}
