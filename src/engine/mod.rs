// src/engine/mod.rs

//! Rebuild engine for `assetpipe dev`.
//!
//! The pure state machine lives in [`core`] (with its event handlers in
//! [`event_handlers`]); the async shell that reads events and talks to the
//! pipeline backend and the reload broadcaster is in [`runtime`].

use std::path::PathBuf;

use crate::pipeline::TaskGraph;
use crate::types::StageName;

/// Monotonic identifier of one pipeline run.
pub type RunId = u64;

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// `stage` is `None` when the run failed before any stage was applied.
    Failed { stage: Option<StageName> },
}

/// Why a run was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// The initial build when `dev` starts.
    Startup,
    /// One or more watched files changed.
    FileWatch,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Exit once idle with nothing queued.
    pub exit_when_idle: bool,
}

/// A run the core wants the backend to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRun {
    pub run_id: RunId,
    pub graph: TaskGraph,
    pub reason: TriggerReason,
    /// Root-relative paths that caused this run (coalesced when queued).
    pub changed: Vec<PathBuf>,
}

/// Events flowing into the runtime from the watcher, the backend and signals.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    ChangeDetected {
        paths: Vec<PathBuf>,
        reason: TriggerReason,
    },
    RunFinished {
        run_id: RunId,
        outcome: RunOutcome,
    },
    /// Served files that no stage writes changed; root-relative.
    ServedFilesChanged { paths: Vec<PathBuf> },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::{CoreRuntime, WatchState};
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
pub use crate::types::TriggerWhileRunningBehaviour;
