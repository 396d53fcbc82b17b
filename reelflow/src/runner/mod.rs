//! Pipeline runner.
//!
//! This module provides:
//! - [`PipelineBuilder`] for assembling and validating a pipeline
//! - [`PipelineRunner`], the sequential executor and its retry state machine
//! - [`RunnerConfig`] and the [`InvalidationMap`] consulted on rewinds
//! - [`PipelineOutcome`], the structured result every run returns

mod builder;
mod config;
mod outcome;
mod retry;
#[allow(clippy::module_inception)]
mod runner;


pub use builder::PipelineBuilder;
pub use config::{QualityGateConfig, RunnerConfig};
pub use outcome::{PipelineOutcome, StepSnapshot};
pub use retry::{InvalidationMap, KeyPattern};
pub use runner::PipelineRunner;
