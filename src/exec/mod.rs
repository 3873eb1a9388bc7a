// src/exec/mod.rs

//! Pipeline execution layer.
//!
//! The runtime never calls the orchestrator directly; it hands
//! [`ScheduledRun`](crate::engine::ScheduledRun)s to a [`PipelineBackend`]
//! and later receives a `RunFinished` event. Tests swap in a fake backend.

pub mod backend;

pub use backend::{PipelineBackend, RealPipelineBackend};
