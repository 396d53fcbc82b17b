//! Scripted steps and recording collaborators.

use crate::bus::{FailureEvent, FailureKind, FailureNotice, FailureSubscriber, Notifier};
use crate::context::{keys, PipelineContext};
use crate::core::{GeneratedArtifact, RetryCheckpointRequest, StepResult};
use crate::runner::PipelineOutcome;
use crate::steps::Step;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;

/// What a [`ScriptedStep`] does on one call.
#[derive(Debug, Clone, PartialEq)]
pub enum Scripted {
    /// Succeed, writing the configured keys and reporting the configured files.
    Succeed,
    /// Return a failed result with this error.
    Fail(String),
    /// Fail like a quality gate, leaving a retry request for `checkpoint`.
    RequestRetry {
        /// Step to resume from.
        checkpoint: String,
        /// Rejection reason.
        reason: String,
    },
    /// Return an `Err` with this message.
    Error(String),
    /// Panic with this message.
    Panic(String),
}

impl Scripted {
    /// Shorthand for [`Scripted::Fail`].
    #[must_use]
    pub fn fail(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }

    /// Shorthand for [`Scripted::RequestRetry`].
    #[must_use]
    pub fn request_retry(checkpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RequestRetry {
            checkpoint: checkpoint.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Scripted::Error`].
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

/// Shared, ordered record of step executions.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns all entries in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Counts the entries equal to `entry`.
    #[must_use]
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }
}

/// A step whose outcome on each call is scripted in advance.
///
/// Calls consume the script front to back; once it is exhausted the
/// fallback outcome (success by default) repeats.
#[derive(Debug)]
pub struct ScriptedStep {
    name: String,
    script: Mutex<VecDeque<Scripted>>,
    fallback: Scripted,
    writes: Vec<(String, Value)>,
    files: Vec<GeneratedArtifact>,
    request_key: String,
    log: Option<ExecutionLog>,
    calls: Mutex<usize>,
    seen_keys: Mutex<Vec<Vec<String>>>,
}

impl ScriptedStep {
    /// Creates a step that always succeeds.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            fallback: Scripted::Succeed,
            writes: Vec::new(),
            files: Vec::new(),
            request_key: keys::QA_RETRY_REQUEST.name().to_string(),
            log: None,
            calls: Mutex::new(0),
            seen_keys: Mutex::new(Vec::new()),
        }
    }

    /// Queues the outcome of the next unscripted call.
    #[must_use]
    pub fn then(self, outcome: Scripted) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    /// Sets the outcome used once the script is exhausted.
    #[must_use]
    pub fn otherwise(mut self, outcome: Scripted) -> Self {
        self.fallback = outcome;
        self
    }

    /// Writes `key` into state (and result data) on every success.
    #[must_use]
    pub fn writes(mut self, key: impl Into<String>, value: Value) -> Self {
        self.writes.push((key.into(), value));
        self
    }

    /// Reports `artifact` on every success.
    #[must_use]
    pub fn with_file(mut self, artifact: GeneratedArtifact) -> Self {
        self.files.push(artifact);
        self
    }

    /// Sets the state key used for retry requests.
    #[must_use]
    pub fn with_request_key(mut self, key: impl Into<String>) -> Self {
        self.request_key = key.into();
        self
    }

    /// Records every call into `log`.
    #[must_use]
    pub fn with_log(mut self, log: ExecutionLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }

    /// Returns the state keys present at the start of each call.
    #[must_use]
    pub fn seen_keys(&self) -> Vec<Vec<String>> {
        self.seen_keys.lock().clone()
    }

    /// Wraps the step for a builder.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Step for ScriptedStep {
    fn step_name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> anyhow::Result<StepResult> {
        *self.calls.lock() += 1;
        self.seen_keys
            .lock()
            .push(ctx.state.keys().map(String::from).collect());
        if let Some(log) = &self.log {
            log.record(&self.name);
        }

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match outcome {
            Scripted::Succeed => {
                let mut data = Map::new();
                for (key, value) in &self.writes {
                    ctx.state.set_raw(key.clone(), value.clone());
                    data.insert(key.clone(), value.clone());
                }
                Ok(StepResult::ok_with(&self.name, data).with_files(self.files.iter().cloned()))
            }
            Scripted::Fail(error) => Ok(StepResult::failure(&self.name, error)),
            Scripted::RequestRetry { checkpoint, reason } => {
                let request = RetryCheckpointRequest::new(checkpoint, &reason, ctx.attempt());
                ctx.state
                    .set_raw(self.request_key.clone(), serde_json::to_value(&request)?);
                Ok(StepResult::failure(&self.name, reason))
            }
            Scripted::Error(message) => Err(anyhow::anyhow!(message)),
            Scripted::Panic(message) => panic!("{message}"),
        }
    }
}

/// A notifier that remembers every notification.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    successes: Mutex<Vec<PipelineOutcome>>,
    failures: Mutex<Vec<FailureNotice>>,
    fail_delivery: bool,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that records, then reports a delivery error.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_delivery: true,
            ..Self::default()
        }
    }

    /// Returns the success notifications.
    #[must_use]
    pub fn successes(&self) -> Vec<PipelineOutcome> {
        self.successes.lock().clone()
    }

    /// Returns the failure notifications.
    #[must_use]
    pub fn failures(&self) -> Vec<FailureNotice> {
        self.failures.lock().clone()
    }

    fn delivery(&self) -> anyhow::Result<()> {
        if self.fail_delivery {
            anyhow::bail!("notification channel unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_success(&self, outcome: &PipelineOutcome) -> anyhow::Result<()> {
        self.successes.lock().push(outcome.clone());
        self.delivery()
    }

    async fn notify_failure(&self, notice: &FailureNotice) -> anyhow::Result<()> {
        self.failures.lock().push(notice.clone());
        self.delivery()
    }
}

/// A failure subscriber that remembers what it saw.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    seen: Mutex<Vec<(String, FailureKind, Option<String>)>>,
}

impl RecordingSubscriber {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the failed step names, one per notification.
    #[must_use]
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().iter().map(|(s, _, _)| s.clone()).collect()
    }

    /// Returns the failure kinds, one per notification.
    #[must_use]
    pub fn kinds(&self) -> Vec<FailureKind> {
        self.seen.lock().iter().map(|(_, k, _)| *k).collect()
    }

    /// Returns the `failed_step` of the response already set when this subscriber ran.
    #[must_use]
    pub fn responses_seen(&self) -> Vec<Option<String>> {
        self.seen.lock().iter().map(|(_, _, r)| r.clone()).collect()
    }

    /// Returns the number of notifications.
    #[must_use]
    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl FailureSubscriber for RecordingSubscriber {
    async fn on_failure(&self, event: &mut FailureEvent<'_>) {
        let response = event
            .response
            .as_ref()
            .and_then(|r| r.failed_step.clone());
        self.seen
            .lock()
            .push((event.step_name.clone(), event.kind, response));
    }
}
