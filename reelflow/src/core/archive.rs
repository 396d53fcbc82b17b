//! Copying raw renders into a durable archive.

use super::GeneratedArtifact;
use crate::context::PipelineContext;
use crate::errors::ReelflowError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Copies `raw_path` into `archive_dir` and records the copy as persisted.
///
/// The archived file is named `<run_id>_<file name>`. The raw file keeps its
/// ledger entry untouched, so unless something else persists it, the
/// retention pass removes it at the end of the run.
pub async fn archive_artifact(
    ctx: &mut PipelineContext,
    raw_path: impl AsRef<Path>,
    archive_dir: impl AsRef<Path>,
) -> Result<PathBuf, ReelflowError> {
    let raw_path = raw_path.as_ref();
    let archive_dir = archive_dir.as_ref();

    let file_name = raw_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot archive '{}': no file name", raw_path.display()),
            )
        })?;

    tokio::fs::create_dir_all(archive_dir).await?;
    let target = archive_dir.join(format!("{}_{file_name}", ctx.run_id()));
    tokio::fs::copy(raw_path, &target).await?;

    let source_step = ctx
        .artifact(&raw_path.to_string_lossy())
        .and_then(|a| a.source_step.clone());
    let mut archived = GeneratedArtifact::persisted(&target)
        .with_description(format!("archived copy of {file_name}"));
    archived.source_step = source_step;
    ctx.record_artifact(archived);

    info!(
        run_id = %ctx.run_id(),
        raw = %raw_path.display(),
        archived = %target.display(),
        "Archived artifact"
    );

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineMode;

    #[tokio::test]
    async fn test_archive_records_persisted_copy() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("render.mp4");
        std::fs::write(&raw, b"frames").unwrap();

        let mut ctx = PipelineContext::with_run_id("run1", PipelineMode::Test);
        ctx.record_artifact(GeneratedArtifact::new(&raw).with_source_step("video_generation"));

        let archived = archive_artifact(&mut ctx, &raw, dir.path().join("archive"))
            .await
            .unwrap();

        assert!(archived.exists());
        assert!(archived.ends_with("run1_render.mp4"));
        assert_eq!(ctx.artifacts().len(), 2);

        let entry = ctx.artifact(&archived.to_string_lossy()).unwrap();
        assert!(entry.is_persisted());
        assert_eq!(entry.source_step.as_deref(), Some("video_generation"));
        assert!(!ctx.artifact(&raw.to_string_lossy()).unwrap().is_persisted());
    }

    #[tokio::test]
    async fn test_archive_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = PipelineContext::with_run_id("run1", PipelineMode::Test);

        let result = archive_artifact(&mut ctx, dir.path().join("nope.mp4"), dir.path()).await;

        assert!(matches!(result, Err(ReelflowError::Io(_))));
        assert!(ctx.artifacts().is_empty());
    }
}
