// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::engine::core::WatchState;
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunId, RunOutcome, RuntimeOptions, ScheduledRun, TriggerReason};
use crate::pipeline::TaskGraph;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Hand this run to the pipeline backend.
    StartRun(ScheduledRun),
    /// Tell connected browsers to reload.
    NotifyReload { run_id: RunId },
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Per-run bookkeeping the handlers mutate.
#[derive(Debug)]
pub(crate) struct RunCounter {
    next: RunId,
    /// A served file changed during the current run.
    reload_pending: bool,
}

impl RunCounter {
    pub(crate) fn new() -> Self {
        Self {
            next: 1,
            reload_pending: false,
        }
    }

    /// Id of the most recent run, 0 before the first one.
    fn last(&self) -> RunId {
        self.next - 1
    }

    fn next(&mut self) -> RunId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// A change arrived.
///
/// - Idle: start a run right away.
/// - Running: hand the change to the queue, which either coalesces it into
///   the single pending re-run or drops it.
pub(crate) fn handle_change(
    state: &mut WatchState,
    queue: &mut TriggerQueue,
    runs: &mut RunCounter,
    graph: &TaskGraph,
    paths: Vec<PathBuf>,
    reason: TriggerReason,
) -> CoreStep {
    match *state {
        WatchState::Idle => {
            let run = start_run(state, runs, graph, paths, reason);
            CoreStep::continue_with(vec![CoreCommand::StartRun(run)])
        }
        WatchState::Running { run_id } => {
            let kept = queue.record(paths);
            debug!(run_id, kept, "change while running");
            CoreStep::continue_with(Vec::new())
        }
    }
}

/// A file the server hands out changed, and no stage produces it.
///
/// Idle: reload right away, no rebuild. Running: reload once the run ends,
/// whatever its outcome, so the browser does not pick up half-written output.
pub(crate) fn handle_served_change(
    state: &WatchState,
    runs: &mut RunCounter,
    paths: &[PathBuf],
) -> CoreStep {
    match *state {
        WatchState::Idle => {
            info!(files = ?paths, "served files changed; reloading");
            CoreStep::continue_with(vec![CoreCommand::NotifyReload {
                run_id: runs.last(),
            }])
        }
        WatchState::Running { run_id } => {
            debug!(run_id, files = ?paths, "served files changed while running");
            runs.reload_pending = true;
            CoreStep::continue_with(Vec::new())
        }
    }
}

/// The backend reported the end of a run.
pub(crate) fn handle_run_finished(
    state: &mut WatchState,
    queue: &mut TriggerQueue,
    runs: &mut RunCounter,
    graph: &TaskGraph,
    options: &RuntimeOptions,
    run_id: RunId,
    outcome: RunOutcome,
) -> CoreStep {
    match *state {
        WatchState::Running { run_id: current } if current == run_id => {}
        _ => {
            warn!(run_id, ?state, "ignoring completion of a run that is not current");
            return CoreStep::continue_with(Vec::new());
        }
    }

    *state = WatchState::Idle;
    let reload_pending = std::mem::take(&mut runs.reload_pending);
    let mut commands = Vec::new();

    match outcome {
        RunOutcome::Success => {
            info!(run_id, "pipeline run succeeded");
            commands.push(CoreCommand::NotifyReload { run_id });
        }
        RunOutcome::Failed { stage } => {
            // Keep watching; the next change gets another chance.
            warn!(run_id, ?stage, "pipeline run failed; waiting for changes");
            if reload_pending {
                commands.push(CoreCommand::NotifyReload { run_id });
            }
        }
    }

    if let Some(paths) = queue.drain() {
        let run = start_run(state, runs, graph, paths, TriggerReason::FileWatch);
        commands.push(CoreCommand::StartRun(run));
        return CoreStep::continue_with(commands);
    }

    if options.exit_when_idle {
        commands.push(CoreCommand::RequestExit);
        return CoreStep {
            commands,
            keep_running: false,
        };
    }

    CoreStep::continue_with(commands)
}

fn start_run(
    state: &mut WatchState,
    runs: &mut RunCounter,
    graph: &TaskGraph,
    changed: Vec<PathBuf>,
    reason: TriggerReason,
) -> ScheduledRun {
    let run_id = runs.next();
    *state = WatchState::Running { run_id };
    ScheduledRun {
        run_id,
        graph: graph.clone(),
        reason,
        changed,
    }
}
