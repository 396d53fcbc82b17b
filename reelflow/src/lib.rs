//! # Reelflow
//!
//! Orchestration core for media-production pipelines.
//!
//! Reelflow runs an ordered list of steps over a single mutable
//! [`PipelineContext`](context::PipelineContext) and provides:
//!
//! - **Sequential execution**: step N+1 never starts before step N has returned
//! - **Artifact tracking**: every file a step reports lands in the run's ledger
//! - **Checkpoint retries**: a quality gate can rewind the run to an earlier step
//! - **Failure funnelling**: every terminal failure goes through one [`FailureBus`](bus::FailureBus)
//! - **Retention**: ephemeral artifacts are removed at the end of a run, persisted ones stay
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reelflow::prelude::*;
//!
//! let runner = PipelineBuilder::new("daily")
//!     .step(Arc::new(NewsCollection::new(client)))?
//!     .step(Arc::new(ScriptGeneration::new(model)))?
//!     .step(Arc::new(MediaQualityGate::new("script_generation")))?
//!     .with_config(RunnerConfig::default().with_retry_budget(1))
//!     .build()?;
//!
//! let outcome = runner.run(PipelineMode::Daily).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod bus;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod runner;
pub mod status;
pub mod steps;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bus::{
        ArtifactCleanupSubscriber, FailureBus, FailureEvent, FailureKind, FailureNotice,
        FailureResponder, FailureSubscriber, LogNotifier, LoggingSubscriber, Notifier,
        NotifierSubscriber,
    };
    pub use crate::context::{keys, PipelineContext, StateBag, StateKey};
    pub use crate::core::{
        archive_artifact, purge_artifacts, CleanupReport, GeneratedArtifact, PersistedOnly,
        PipelineMode, RetentionPolicy, RetryCheckpointRequest, StepFault, StepResult,
    };
    pub use crate::errors::{
        ConfigError, ContractErrorInfo, PipelineValidationError, ReelflowError, StateError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::runner::{
        InvalidationMap, KeyPattern, PipelineBuilder, PipelineOutcome, PipelineRunner,
        QualityGateConfig, RunnerConfig, StepSnapshot,
    };
    pub use crate::status::{
        InMemoryStatusStore, JsonFileStatusStore, RunStatus, RunStatusRecord, RunStatusStore,
    };
    pub use crate::steps::{catalog, FnStep, MediaQualityGate, NoOpStep, Step};
    pub use crate::utils::{generate_run_id, iso_timestamp};
}
