//! Generated artifact type for tracking files produced by steps.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A file produced during a pipeline run.
///
/// The `persisted` flag is one-way: once an artifact has been marked as
/// persisted it stays that way, and no retention pass may delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Filesystem path of the artifact. Unique within a run.
    pub path: String,

    /// Whether the file must survive end-of-run cleanup.
    #[serde(default)]
    persisted: bool,

    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Name of the step that produced the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_step: Option<String>,

    /// When the artifact was recorded (ISO 8601).
    pub created_at: String,
}

impl GeneratedArtifact {
    /// Creates an ephemeral artifact for `path`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().into_owned(),
            persisted: false,
            description: None,
            source_step: None,
            created_at: crate::utils::iso_timestamp(),
        }
    }

    /// Creates an artifact that must survive cleanup.
    #[must_use]
    pub fn persisted(path: impl AsRef<Path>) -> Self {
        let mut artifact = Self::new(path);
        artifact.persisted = true;
        artifact
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the producing step.
    #[must_use]
    pub fn with_source_step(mut self, step: impl Into<String>) -> Self {
        self.source_step = Some(step.into());
        self
    }

    /// Returns true if the artifact survives cleanup.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Flags the artifact as persisted. There is no way back.
    pub fn mark_persisted(&mut self) {
        self.persisted = true;
    }

    /// Returns the artifact path as a [`Path`].
    #[must_use]
    pub fn as_path(&self) -> &Path {
        Path::new(&self.path)
    }

    /// Folds a later report for the same path into this entry.
    ///
    /// Persistence is sticky; description and source step are refreshed
    /// only when the later report carries them.
    pub(crate) fn absorb(&mut self, later: Self) {
        if later.persisted {
            self.persisted = true;
        }
        if later.description.is_some() {
            self.description = later.description;
        }
        if later.source_step.is_some() {
            self.source_step = later.source_step;
        }
    }
}
