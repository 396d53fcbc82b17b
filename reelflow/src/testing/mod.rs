//! Testing utilities for reelflow pipelines.
//!
//! This module provides:
//! - [`ScriptedStep`], a step whose outcome on each call is set in advance
//! - [`ExecutionLog`], a shared recorder of execution order
//! - Recording notifier and failure subscriber
//! - [`LogCapture`], an in-memory writer for log assertions

mod logs;
mod mocks;

pub use logs::LogCapture;
pub use mocks::{
    ExecutionLog, RecordingNotifier, RecordingSubscriber, Scripted, ScriptedStep,
};
pub use crate::events::CollectingEventSink;
