//! Retry checkpoint request written by a quality gate.

use serde::{Deserialize, Serialize};

/// Asks the runner to resume the pipeline from an earlier step.
///
/// Only the designated quality-gate step writes this, and only alongside a
/// failed result. The runner reads it back from the context state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCheckpointRequest {
    /// Name of the step to resume from.
    pub start_step: String,
    /// Why the gate rejected the current attempt.
    pub reason: String,
    /// The attempt that produced the rejection (1-based).
    pub attempt: u32,
}

impl RetryCheckpointRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(start_step: impl Into<String>, reason: impl Into<String>, attempt: u32) -> Self {
        Self {
            start_step: start_step.into(),
            reason: reason.into(),
            attempt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_shape() {
        let request = RetryCheckpointRequest::new("script_generation", "subtitle drift", 1);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "start_step": "script_generation",
                "reason": "subtitle drift",
                "attempt": 1,
            })
        );
    }
}
