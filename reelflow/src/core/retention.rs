//! Retention policy and the end-of-run deletion pass.

use super::GeneratedArtifact;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::io::ErrorKind;
use tracing::{debug, warn};

/// Decides which artifacts survive the end of a run.
pub trait RetentionPolicy: Send + Sync + Debug {
    /// Returns true if the artifact must be kept on disk.
    fn should_retain(&self, artifact: &GeneratedArtifact) -> bool;

    /// Returns the artifacts this policy would delete.
    ///
    /// Persisted artifacts are never selected, whatever `should_retain` says.
    fn select_for_deletion<'a>(&self, artifacts: &'a [GeneratedArtifact]) -> Vec<&'a GeneratedArtifact> {
        artifacts
            .iter()
            .filter(|a| !a.is_persisted() && !self.should_retain(a))
            .collect()
    }
}

/// Default policy: keep exactly the persisted artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersistedOnly;

impl RetentionPolicy for PersistedOnly {
    fn should_retain(&self, artifact: &GeneratedArtifact) -> bool {
        artifact.is_persisted()
    }
}

/// Outcome of a deletion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Paths removed by this pass.
    pub deleted: Vec<String>,
    /// Paths that were already gone.
    pub missing: Vec<String>,
    /// Paths that could not be removed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl CleanupReport {
    /// Returns true if every selected artifact is now absent from disk.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deletes every artifact the policy does not retain.
///
/// Directories are removed recursively. A path that no longer exists is
/// recorded as missing rather than failed, so running the pass twice is
/// harmless.
pub async fn purge_artifacts(
    artifacts: &[GeneratedArtifact],
    policy: &dyn RetentionPolicy,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    for artifact in policy.select_for_deletion(artifacts) {
        let path = artifact.as_path();
        let removal = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
            Ok(_) => tokio::fs::remove_file(path).await,
            Err(e) => Err(e),
        };

        match removal {
            Ok(()) => {
                debug!(path = %artifact.path, "Removed ephemeral artifact");
                report.deleted.push(artifact.path.clone());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                report.missing.push(artifact.path.clone());
            }
            Err(e) => {
                warn!(path = %artifact.path, error = %e, "Failed to remove artifact");
                report.failed.push((artifact.path.clone(), e.to_string()));
            }
        }
    }

    report
}
