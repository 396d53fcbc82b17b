//! Where lifecycle events go.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn, Level};

/// Receives the lifecycle events of a run.
///
/// `payload` is always an object built by [`event_payload`](super::event_payload):
/// `run_id`, `mode` and `attempt`, plus the fields of the event itself.
/// Sinks cannot fail the run.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    async fn emit(&self, event_type: &str, payload: Value);
}

/// Discards every event. The runner's default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _payload: Value) {}
}

/// Turns events into log lines with the run identity as structured fields.
///
/// `*.failed` events are always logged at warn level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Logs at `level`; anything more verbose than debug counts as debug.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Logs at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Logs at info level.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_event(&self, event_type: &str, payload: &Value) {
        let text = |field: &str| payload.get(field).and_then(Value::as_str).unwrap_or_default();
        let run_id = text("run_id");
        let mode = text("mode");
        let step = text("step");
        let attempt = payload.get("attempt").and_then(Value::as_u64).unwrap_or_default();

        if event_type.ends_with(".failed") {
            warn!(
                event = %event_type,
                run_id,
                mode,
                attempt,
                step,
                error = text("error"),
                "Pipeline event"
            );
        } else if self.level == Level::DEBUG || self.level == Level::TRACE {
            debug!(event = %event_type, run_id, mode, attempt, step, "Pipeline event");
        } else {
            info!(event = %event_type, run_id, mode, attempt, step, "Pipeline event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, payload: Value) {
        self.log_event(event_type, &payload);
    }
}

/// Keeps every event in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<(String, Value)>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.read().clone()
    }

    /// Returns the event types in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<(String, Value)> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, payload: Value) {
        self.events.write().push((event_type.to_string(), payload));
    }
}
