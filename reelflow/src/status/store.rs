//! Run status store trait and implementations.

use super::RunStatusRecord;
use crate::errors::ReelflowError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persists the latest status of each run.
#[async_trait]
pub trait RunStatusStore: Send + Sync {
    /// Writes `record`, replacing any earlier record for the same run.
    async fn record(&self, record: RunStatusRecord) -> Result<(), ReelflowError>;

    /// Loads the latest record for a run.
    async fn load(&self, run_id: &str) -> Result<Option<RunStatusRecord>, ReelflowError>;
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    records: RwLock<HashMap<String, RunStatusRecord>>,
    history: RwLock<Vec<RunStatusRecord>>,
}

impl InMemoryStatusStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every record written, in order.
    #[must_use]
    pub fn history(&self) -> Vec<RunStatusRecord> {
        self.history.read().clone()
    }

    /// Returns the latest record for a run without awaiting.
    #[must_use]
    pub fn latest(&self, run_id: &str) -> Option<RunStatusRecord> {
        self.records.read().get(run_id).cloned()
    }
}

#[async_trait]
impl RunStatusStore for InMemoryStatusStore {
    async fn record(&self, record: RunStatusRecord) -> Result<(), ReelflowError> {
        self.history.write().push(record.clone());
        self.records.write().insert(record.run_id.clone(), record);
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<RunStatusRecord>, ReelflowError> {
        Ok(self.latest(run_id))
    }
}

/// Writes one `<run_id>.json` file per run into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStatusStore {
    dir: PathBuf,
}

impl JsonFileStatusStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory holding the records.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, run_id: &str) -> Result<PathBuf, ReelflowError> {
        if run_id.is_empty() || run_id.contains(['/', '\\']) || run_id.starts_with('.') {
            return Err(ReelflowError::StatusStore(format!(
                "run id '{run_id}' cannot be used as a file name"
            )));
        }
        Ok(self.dir.join(format!("{run_id}.json")))
    }
}

#[async_trait]
impl RunStatusStore for JsonFileStatusStore {
    async fn record(&self, record: RunStatusRecord) -> Result<(), ReelflowError> {
        let path = self.path_for(&record.run_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let body = serde_json::to_vec_pretty(&record)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(run_id = %record.run_id, status = %record.status, path = %path.display(), "Recorded run status");
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<RunStatusRecord>, ReelflowError> {
        let path = self.path_for(run_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineMode;
    use crate::status::RunStatus;

    #[tokio::test]
    async fn test_in_memory_store_keeps_latest() {
        let store = InMemoryStatusStore::new();
        store
            .record(RunStatusRecord::new("r1", PipelineMode::Daily, RunStatus::Running))
            .await
            .unwrap();
        store
            .record(RunStatusRecord::new("r1", PipelineMode::Daily, RunStatus::Succeeded))
            .await
            .unwrap();

        let latest = store.load("r1").await.unwrap().unwrap();
        assert_eq!(latest.status, RunStatus::Succeeded);
        assert_eq!(store.history().len(), 2);
        assert!(store.load("r2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStatusStore::new(dir.path().join("status"));

        let record = RunStatusRecord::new("20240101_000000_abcdef12", PipelineMode::Special, RunStatus::Failed)
            .with_failure("video_generation", "renderer crashed");
        store.record(record.clone()).await.unwrap();

        assert!(dir.path().join("status/20240101_000000_abcdef12.json").exists());
        let loaded = store.load("20240101_000000_abcdef12").await.unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn test_json_file_store_missing_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStatusStore::new(dir.path());

        assert!(store.load("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_file_store_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStatusStore::new(dir.path());
        let record = RunStatusRecord::new("../escape", PipelineMode::Test, RunStatus::Running);

        let err = store.record(record).await.unwrap_err();
        assert!(matches!(err, ReelflowError::StatusStore(_)));
    }
}
