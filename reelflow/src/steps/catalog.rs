//! The well-known production steps and the state they own.
//!
//! This table is data, not behavior: the runner never consults it directly.
//! It feeds [`InvalidationMap::well_known`](crate::runner::InvalidationMap::well_known)
//! and lets tooling check that a pipeline's reads are satisfied by earlier
//! writes. A trailing `*` in an invalidation entry is a key prefix.

use crate::context::keys;

/// Collects the news items for the episode.
pub const NEWS_COLLECTION: &str = "news_collection";
/// Writes the narration script.
pub const SCRIPT_GENERATION: &str = "script_generation";
/// Designs the visual style.
pub const VISUAL_DESIGN_GENERATION: &str = "visual_design_generation";
/// Writes title, description and tags.
pub const METADATA_GENERATION: &str = "metadata_generation";
/// Renders the thumbnail.
pub const THUMBNAIL_GENERATION: &str = "thumbnail_generation";
/// Synthesizes the narration audio.
pub const AUDIO_SYNTHESIS: &str = "audio_synthesis";
/// Transcribes the narration back into word timings.
pub const AUDIO_TRANSCRIPTION: &str = "audio_transcription";
/// Aligns subtitles to the word timings.
pub const SUBTITLE_ALIGNMENT: &str = "subtitle_alignment";
/// Renders the video.
pub const VIDEO_GENERATION: &str = "video_generation";
/// Checks the rendered media. The designated quality gate.
pub const MEDIA_QUALITY_ASSURANCE: &str = "media_quality_assurance";
/// Uploads the media to Drive.
pub const DRIVE_UPLOAD: &str = "drive_upload";
/// Publishes the video on YouTube.
pub const YOUTUBE_UPLOAD: &str = "youtube_upload";

/// What a step reads, writes and must forget when the run rewinds past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepContract {
    /// Step name.
    pub name: &'static str,
    /// Keys the step expects earlier steps to have written.
    pub reads: &'static [&'static str],
    /// Keys the step writes.
    pub writes: &'static [&'static str],
    /// Keys (or `prefix*` patterns) cleared when the run rewinds to or before the step.
    pub invalidates: &'static [&'static str],
}

/// The standard daily pipeline, in execution order.
pub const STEPS: &[StepContract] = &[
    StepContract {
        name: NEWS_COLLECTION,
        reads: &[],
        writes: &[keys::NEWS_ITEMS.name()],
        invalidates: &[keys::NEWS_ITEMS.name()],
    },
    StepContract {
        name: SCRIPT_GENERATION,
        reads: &[keys::NEWS_ITEMS.name()],
        writes: &[keys::SCRIPT_CONTENT.name(), keys::SCRIPT_PATH.name()],
        invalidates: &[
            keys::SCRIPT_CONTENT.name(),
            keys::SCRIPT_PATH.name(),
            keys::SCRIPT_STRUCTURED.name(),
        ],
    },
    StepContract {
        name: VISUAL_DESIGN_GENERATION,
        reads: &[keys::NEWS_ITEMS.name(), keys::SCRIPT_CONTENT.name()],
        writes: &[keys::VISUAL_DESIGN.name(), keys::VISUAL_DESIGN_DICT.name()],
        invalidates: &[keys::VISUAL_DESIGN_FAMILY],
    },
    StepContract {
        name: METADATA_GENERATION,
        reads: &[keys::NEWS_ITEMS.name(), keys::SCRIPT_CONTENT.name()],
        writes: &[keys::METADATA.name()],
        invalidates: &[keys::METADATA.name()],
    },
    StepContract {
        name: THUMBNAIL_GENERATION,
        reads: &[
            keys::METADATA.name(),
            keys::NEWS_ITEMS.name(),
            keys::VISUAL_DESIGN.name(),
        ],
        writes: &[keys::THUMBNAIL_PATH.name()],
        invalidates: &[keys::THUMBNAIL_PATH.name()],
    },
    StepContract {
        name: AUDIO_SYNTHESIS,
        reads: &[keys::SCRIPT_CONTENT.name(), keys::SCRIPT_STRUCTURED.name()],
        writes: &[keys::AUDIO_PATH.name()],
        invalidates: &[keys::AUDIO_PATH.name()],
    },
    StepContract {
        name: AUDIO_TRANSCRIPTION,
        reads: &[keys::AUDIO_PATH.name()],
        writes: &[keys::STT_WORDS.name()],
        invalidates: &[keys::STT_WORDS.name()],
    },
    StepContract {
        name: SUBTITLE_ALIGNMENT,
        reads: &[keys::SCRIPT_CONTENT.name(), keys::STT_WORDS.name()],
        writes: &[keys::SUBTITLE_PATH.name(), keys::ALIGNED_SUBTITLES.name()],
        invalidates: &[keys::SUBTITLE_PATH.name(), keys::ALIGNED_SUBTITLES.name()],
    },
    StepContract {
        name: VIDEO_GENERATION,
        reads: &[
            keys::AUDIO_PATH.name(),
            keys::SUBTITLE_PATH.name(),
            keys::SCRIPT_CONTENT.name(),
            keys::NEWS_ITEMS.name(),
            keys::METADATA.name(),
        ],
        writes: &[keys::VIDEO_PATH.name(), keys::BROLL_FAMILY],
        invalidates: &[keys::VIDEO_PATH.name(), keys::BROLL_FAMILY, keys::ARCHIVED_FAMILY],
    },
    StepContract {
        name: MEDIA_QUALITY_ASSURANCE,
        reads: &[
            keys::SCRIPT_PATH.name(),
            keys::SCRIPT_CONTENT.name(),
            keys::AUDIO_PATH.name(),
            keys::SUBTITLE_PATH.name(),
            keys::VIDEO_PATH.name(),
        ],
        writes: &[
            keys::QA_PASSED.name(),
            keys::QA_REPORT.name(),
            keys::QA_RETRY_REQUEST.name(),
        ],
        invalidates: &[keys::QA_PASSED.name(), keys::QA_RETRY_REQUEST.name()],
    },
    StepContract {
        name: DRIVE_UPLOAD,
        reads: &[
            keys::VIDEO_PATH.name(),
            keys::THUMBNAIL_PATH.name(),
            keys::SUBTITLE_PATH.name(),
            keys::METADATA.name(),
        ],
        writes: &[keys::DRIVE_RESULT.name()],
        invalidates: &[keys::DRIVE_RESULT.name()],
    },
    StepContract {
        name: YOUTUBE_UPLOAD,
        reads: &[
            keys::VIDEO_PATH.name(),
            keys::METADATA.name(),
            keys::THUMBNAIL_PATH.name(),
            keys::SUBTITLE_PATH.name(),
        ],
        writes: &[
            keys::YOUTUBE_RESULT.name(),
            keys::VIDEO_ID.name(),
            keys::VIDEO_URL.name(),
        ],
        invalidates: &[
            keys::YOUTUBE_RESULT.name(),
            keys::VIDEO_ID.name(),
            keys::VIDEO_URL.name(),
        ],
    },
];

/// Looks up the contract of a well-known step.
#[must_use]
pub fn contract(name: &str) -> Option<&'static StepContract> {
    STEPS.iter().find(|c| c.name == name)
}

/// Returns the names of the well-known steps in execution order.
pub fn step_names() -> impl Iterator<Item = &'static str> {
    STEPS.iter().map(|c| c.name)
}

/// Lists `(step, key)` pairs where a step reads a key no earlier step writes.
///
/// `order` is the sequence of step names in the pipeline; unknown names are
/// skipped.
#[must_use]
pub fn unsatisfied_reads(order: &[&str]) -> Vec<(String, String)> {
    let mut written: Vec<&str> = Vec::new();
    let mut missing = Vec::new();

    for name in order {
        let Some(contract) = contract(name) else {
            continue;
        };
        for read in contract.reads {
            if !written.iter().any(|w| covers(w, read)) {
                missing.push(((*name).to_string(), (*read).to_string()));
            }
        }
        written.extend(contract.writes.iter().copied());
    }

    missing
}

fn covers(written: &str, key: &str) -> bool {
    match written.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => written == key,
    }
}
