//! Run context and state.
//!
//! A [`PipelineContext`] is created per run and handed by mutable reference
//! to each step in turn. Steps read their inputs from and write their outputs
//! to its [`StateBag`], using the typed keys in [`keys`] for the well-known
//! entries.

pub mod keys;
mod pipeline;
mod state;

pub use keys::StateKey;
pub use pipeline::PipelineContext;
pub use state::StateBag;
