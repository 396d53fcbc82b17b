//! Well-known state keys.
//!
//! Each constant names a key one of the standard steps writes, together with
//! the type stored under it. Constants ending in `_FAMILY` are key patterns
//! whose trailing `*` covers a family of keys (e.g. every `broll_` entry
//! written by the video step).

use crate::core::RetryCheckpointRequest;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// A state key bound to the type of its value.
pub struct StateKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StateKey<T> {
    /// Declares a key.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the key string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for StateKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StateKey<T> {}

impl<T> fmt::Debug for StateKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateKey").field(&self.name).finish()
    }
}

impl<T> fmt::Display for StateKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Collected news items.
pub const NEWS_ITEMS: StateKey<Vec<Value>> = StateKey::new("news_items");
/// Narration script text.
pub const SCRIPT_CONTENT: StateKey<String> = StateKey::new("script_content");
/// Path of the saved script file.
pub const SCRIPT_PATH: StateKey<String> = StateKey::new("script_path");
/// Structured script (segments, speakers).
pub const SCRIPT_STRUCTURED: StateKey<Value> = StateKey::new("script_structured");
/// Visual design description.
pub const VISUAL_DESIGN: StateKey<Value> = StateKey::new("visual_design");
/// Visual design as a flat dictionary.
pub const VISUAL_DESIGN_DICT: StateKey<Value> = StateKey::new("visual_design_dict");
/// Video metadata (title, description, tags).
pub const METADATA: StateKey<Value> = StateKey::new("metadata");
/// Path of the rendered thumbnail.
pub const THUMBNAIL_PATH: StateKey<String> = StateKey::new("thumbnail_path");
/// Path of the synthesized narration.
pub const AUDIO_PATH: StateKey<String> = StateKey::new("audio_path");
/// Word timings from speech-to-text.
pub const STT_WORDS: StateKey<Vec<Value>> = StateKey::new("stt_words");
/// Path of the subtitle file.
pub const SUBTITLE_PATH: StateKey<String> = StateKey::new("subtitle_path");
/// Aligned subtitle cues.
pub const ALIGNED_SUBTITLES: StateKey<Vec<Value>> = StateKey::new("aligned_subtitles");
/// Path of the rendered video.
pub const VIDEO_PATH: StateKey<String> = StateKey::new("video_path");
/// Whether the media passed quality assurance.
pub const QA_PASSED: StateKey<bool> = StateKey::new("qa_passed");
/// Quality assurance report.
pub const QA_REPORT: StateKey<Value> = StateKey::new("qa_report");
/// Checkpoint request written by a failing quality gate.
pub const QA_RETRY_REQUEST: StateKey<RetryCheckpointRequest> = StateKey::new("qa_retry_request");
/// Drive upload result.
pub const DRIVE_RESULT: StateKey<Value> = StateKey::new("drive_result");
/// YouTube upload result.
pub const YOUTUBE_RESULT: StateKey<Value> = StateKey::new("youtube_result");
/// Uploaded video id.
pub const VIDEO_ID: StateKey<String> = StateKey::new("video_id");
/// Uploaded video URL.
pub const VIDEO_URL: StateKey<String> = StateKey::new("video_url");

/// Every visual design key.
pub const VISUAL_DESIGN_FAMILY: &str = "visual_design*";
/// B-roll keys written by the video step, one per clip.
pub const BROLL_FAMILY: &str = "broll_*";
/// Archive keys written when renders are archived.
pub const ARCHIVED_FAMILY: &str = "archived_*";
