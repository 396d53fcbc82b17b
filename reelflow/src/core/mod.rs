//! Core domain model types for reelflow.
//!
//! This module contains the fundamental types used throughout the runner:
//! - Generated artifacts and the retention policy that decides their fate
//! - The step result type and step faults
//! - The retry checkpoint request a quality gate hands to the runner
//! - The pipeline mode enum

mod archive;
mod artifact;
mod checkpoint;
mod mode;
mod result;
mod retention;

pub use archive::archive_artifact;
pub use artifact::GeneratedArtifact;
pub use checkpoint::RetryCheckpointRequest;
pub use mode::PipelineMode;
pub use result::{StepFault, StepResult};
pub use retention::{purge_artifacts, CleanupReport, PersistedOnly, RetentionPolicy};
