//! Lifecycle events.
//!
//! The runner reports what it is doing through an [`EventSink`]. Every
//! payload carries the run id, the mode and the attempt number so events
//! from concurrent runs can be told apart.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::context::PipelineContext;
use serde_json::{json, Value};

/// Builds an event payload for `ctx`, merged with `extra` when it is an object.
#[must_use]
pub fn event_payload(ctx: &PipelineContext, extra: Value) -> Value {
    let mut payload = json!({
        "run_id": ctx.run_id(),
        "mode": ctx.mode().as_str(),
        "attempt": ctx.attempt(),
    });
    if let (Some(base), Value::Object(extra)) = (payload.as_object_mut(), extra) {
        base.extend(extra);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineMode;

    #[test]
    fn test_event_payload_enrichment() {
        let ctx = PipelineContext::with_run_id("run42", PipelineMode::Special);
        let payload = event_payload(&ctx, json!({"step": "audio_synthesis"}));

        assert_eq!(
            payload,
            json!({
                "run_id": "run42",
                "mode": "special",
                "attempt": 1,
                "step": "audio_synthesis",
            })
        );
    }

    #[test]
    fn test_event_payload_ignores_non_object_extra() {
        let ctx = PipelineContext::with_run_id("run42", PipelineMode::Test);
        let payload = event_payload(&ctx, Value::Null);

        assert_eq!(payload["run_id"], json!("run42"));
        assert_eq!(payload.as_object().map(serde_json::Map::len), Some(3));
    }
}
