//! Media quality gate.

use super::{catalog, Step};
use crate::context::{keys, PipelineContext, StateKey};
use crate::core::{RetryCheckpointRequest, StepResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

/// The files the gate inspects, in report order.
const CHECKED_FILES: [StateKey<String>; 4] = [
    keys::SCRIPT_PATH,
    keys::AUDIO_PATH,
    keys::SUBTITLE_PATH,
    keys::VIDEO_PATH,
];

#[derive(Debug, Clone, Serialize)]
struct FileCheck {
    key: &'static str,
    path: Option<String>,
    passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    problem: Option<String>,
}

/// Checks the rendered media before anything is uploaded.
///
/// The gate passes when the script text is non-blank and every media file
/// named in state exists and is non-empty. On failure it writes a
/// [`RetryCheckpointRequest`] naming its checkpoint step, which the runner
/// may honor by rewinding the run.
#[derive(Debug, Clone)]
pub struct MediaQualityGate {
    name: String,
    checkpoint: String,
    request_key: String,
}

impl MediaQualityGate {
    /// Creates a gate that asks to resume from `checkpoint` on failure.
    #[must_use]
    pub fn new(checkpoint: impl Into<String>) -> Self {
        Self {
            name: catalog::MEDIA_QUALITY_ASSURANCE.to_string(),
            checkpoint: checkpoint.into(),
            request_key: keys::QA_RETRY_REQUEST.name().to_string(),
        }
    }

    /// Overrides the step name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the state key the retry request is written to.
    #[must_use]
    pub fn with_request_key(mut self, key: impl Into<String>) -> Self {
        self.request_key = key.into();
        self
    }

    /// Returns the checkpoint step name.
    #[must_use]
    pub fn checkpoint(&self) -> &str {
        &self.checkpoint
    }

    async fn check_file(ctx: &PipelineContext, key: StateKey<String>) -> FileCheck {
        let path = match ctx.state.get(&key) {
            Ok(path) => path,
            Err(e) => {
                return FileCheck {
                    key: key.name(),
                    path: None,
                    passed: false,
                    problem: Some(e.to_string()),
                }
            }
        };
        let Some(path) = path else {
            return FileCheck {
                key: key.name(),
                path: None,
                passed: false,
                problem: Some("not set".to_string()),
            };
        };

        let problem = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.len() == 0 => Some("file is empty".to_string()),
            Ok(_) => None,
            Err(e) => Some(format!("unreadable: {e}")),
        };

        FileCheck {
            key: key.name(),
            passed: problem.is_none(),
            path: Some(path),
            problem,
        }
    }
}

#[async_trait]
impl Step for MediaQualityGate {
    fn step_name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> anyhow::Result<StepResult> {
        let mut checks = Vec::with_capacity(CHECKED_FILES.len());
        for key in CHECKED_FILES {
            checks.push(Self::check_file(ctx, key).await);
        }

        let script_ok = ctx
            .state
            .get(&keys::SCRIPT_CONTENT)
            .ok()
            .flatten()
            .is_some_and(|s| !s.trim().is_empty());

        let mut problems: Vec<String> = checks
            .iter()
            .filter_map(|c| c.problem.as_ref().map(|p| format!("{}: {p}", c.key)))
            .collect();
        if !script_ok {
            problems.insert(0, format!("{}: blank or missing", keys::SCRIPT_CONTENT.name()));
        }
        let passed = problems.is_empty();

        let report = json!({
            "passed": passed,
            "attempt": ctx.attempt(),
            "script_content_ok": script_ok,
            "files": checks,
            "problems": problems,
        });
        ctx.state.set(&keys::QA_PASSED, &passed)?;
        ctx.state.set(&keys::QA_REPORT, &report)?;

        if passed {
            ctx.state.remove(&self.request_key);
            info!(run_id = %ctx.run_id(), attempt = ctx.attempt(), "Media quality checks passed");
            return Ok(StepResult::ok(&self.name).with_value("qa_passed", json!(true)));
        }

        let reason = problems.join("; ");
        let request = RetryCheckpointRequest::new(&self.checkpoint, &reason, ctx.attempt());
        ctx.state
            .set_raw(self.request_key.clone(), serde_json::to_value(&request)?);

        warn!(
            run_id = %ctx.run_id(),
            attempt = ctx.attempt(),
            checkpoint = %self.checkpoint,
            reason = %reason,
            "Media quality checks failed"
        );
        Ok(StepResult::failure(
            &self.name,
            format!("Media quality checks failed: {reason}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineMode;
    use std::path::Path;

    fn seed(ctx: &mut PipelineContext, dir: &Path, video_bytes: &[u8]) {
        for (key, file, bytes) in [
            (keys::SCRIPT_PATH, "script.txt", b"script".as_slice()),
            (keys::AUDIO_PATH, "audio.wav", b"RIFF".as_slice()),
            (keys::SUBTITLE_PATH, "subs.srt", b"1\n00:00".as_slice()),
            (keys::VIDEO_PATH, "video.mp4", video_bytes),
        ] {
            let path = dir.join(file);
            std::fs::write(&path, bytes).unwrap();
            ctx.state
                .set(&key, &path.to_string_lossy().into_owned())
                .unwrap();
        }
        ctx.state
            .set(&keys::SCRIPT_CONTENT, &"Today's headlines".to_string())
            .unwrap();
    }

    #[tokio::test]
    async fn test_gate_passes_on_complete_media() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = PipelineContext::new(PipelineMode::Test);
        seed(&mut ctx, dir.path(), b"frames");
        ctx.state.set_raw("qa_retry_request", json!({"stale": true}));

        let gate = MediaQualityGate::new(catalog::SCRIPT_GENERATION);
        let result = gate.execute(&mut ctx).await.unwrap();

        assert!(result.success);
        assert_eq!(ctx.state.get(&keys::QA_PASSED).unwrap(), Some(true));
        assert!(!ctx.state.contains("qa_retry_request"));
    }

    #[tokio::test]
    async fn test_gate_requests_checkpoint_on_empty_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = PipelineContext::new(PipelineMode::Test);
        seed(&mut ctx, dir.path(), b"");

        let gate = MediaQualityGate::new(catalog::AUDIO_SYNTHESIS);
        let result = gate.execute(&mut ctx).await.unwrap();

        assert!(!result.success);
        assert!(result.error_message().contains("video_path: file is empty"));
        assert_eq!(ctx.state.get(&keys::QA_PASSED).unwrap(), Some(false));

        let request = ctx.state.require(&keys::QA_RETRY_REQUEST).unwrap();
        assert_eq!(request.start_step, "audio_synthesis");
        assert_eq!(request.attempt, 1);
    }

    #[tokio::test]
    async fn test_gate_reports_unset_paths() {
        let mut ctx = PipelineContext::new(PipelineMode::Test);
        let gate = MediaQualityGate::new(catalog::SCRIPT_GENERATION)
            .with_name("qa")
            .with_request_key("qa_request");

        let result = gate.execute(&mut ctx).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.step_name, "qa");
        assert!(ctx.state.contains("qa_request"));
        let report = ctx.state.require(&keys::QA_REPORT).unwrap();
        assert_eq!(report["problems"].as_array().map(Vec::len), Some(5));
    }
}
