// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! Consumes [`RuntimeEvent`]s and returns the commands the IO shell should
//! carry out. No channels, no Tokio, no filesystem: everything here is
//! deterministic and unit tested directly.

use crate::engine::event_handlers::{
    CoreCommand, CoreStep, RunCounter, handle_change, handle_run_finished, handle_served_change,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunId, RuntimeEvent, RuntimeOptions};
use crate::pipeline::TaskGraph;
use crate::types::TriggerWhileRunningBehaviour;

/// Whether a pipeline run is in flight. At most one run exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Running { run_id: RunId },
}

#[derive(Debug)]
pub struct CoreRuntime {
    state: WatchState,
    queue: TriggerQueue,
    runs: RunCounter,
    graph: TaskGraph,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(
        graph: TaskGraph,
        behaviour: TriggerWhileRunningBehaviour,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            state: WatchState::Idle,
            queue: TriggerQueue::new(behaviour),
            runs: RunCounter::new(),
            graph,
            options,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == WatchState::Idle
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Handle a single runtime event.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::ChangeDetected { paths, reason } => handle_change(
                &mut self.state,
                &mut self.queue,
                &mut self.runs,
                &self.graph,
                paths,
                reason,
            ),
            RuntimeEvent::RunFinished { run_id, outcome } => handle_run_finished(
                &mut self.state,
                &mut self.queue,
                &mut self.runs,
                &self.graph,
                &self.options,
                run_id,
                outcome,
            ),
            RuntimeEvent::ServedFilesChanged { paths } => {
                handle_served_change(&self.state, &mut self.runs, &paths)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: vec![CoreCommand::RequestExit],
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::engine::{RunOutcome, ScheduledRun, TriggerReason};
    use crate::types::StageName;

    fn core(behaviour: TriggerWhileRunningBehaviour) -> CoreRuntime {
        CoreRuntime::new(TaskGraph::full(), behaviour, RuntimeOptions::default())
    }

    fn change(path: &str) -> RuntimeEvent {
        RuntimeEvent::ChangeDetected {
            paths: vec![PathBuf::from(path)],
            reason: TriggerReason::FileWatch,
        }
    }

    fn finished(run_id: RunId, outcome: RunOutcome) -> RuntimeEvent {
        RuntimeEvent::RunFinished { run_id, outcome }
    }

    fn started(step: &CoreStep) -> Vec<&ScheduledRun> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::StartRun(run) => Some(run),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn idle_change_starts_full_run() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        let step = core.step(change("components/scripts/a.js"));

        let runs = started(&step);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, 1);
        assert_eq!(runs[0].graph.stages(), &StageName::ALL);
        assert_eq!(core.state(), WatchState::Running { run_id: 1 });
    }

    #[test]
    fn triggers_while_running_coalesce_into_one_rerun() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        core.step(change("a.js"));

        assert!(started(&core.step(change("b.js"))).is_empty());
        assert!(started(&core.step(change("c.scss"))).is_empty());

        let step = core.step(finished(1, RunOutcome::Success));
        let runs = started(&step);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, 2);
        assert_eq!(runs[0].changed, vec![PathBuf::from("b.js"), PathBuf::from("c.scss")]);
        assert!(core.queue_is_empty());

        let step = core.step(finished(2, RunOutcome::Success));
        assert!(started(&step).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn ignore_mode_drops_triggers_while_running() {
        let mut core = core(TriggerWhileRunningBehaviour::Ignore);
        core.step(change("a.js"));
        core.step(change("b.js"));

        let step = core.step(finished(1, RunOutcome::Success));
        assert!(started(&step).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn reload_only_after_success() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        core.step(change("a.js"));
        let step = core.step(finished(1, RunOutcome::Failed { stage: Some(StageName::Minify) }));
        assert!(!step.commands.iter().any(|c| matches!(c, CoreCommand::NotifyReload { .. })));
        assert!(step.keep_running);

        core.step(change("a.js"));
        let step = core.step(finished(2, RunOutcome::Success));
        assert!(step.commands.contains(&CoreCommand::NotifyReload { run_id: 2 }));
    }

    fn served(path: &str) -> RuntimeEvent {
        RuntimeEvent::ServedFilesChanged {
            paths: vec![PathBuf::from(path)],
        }
    }

    fn reloads(step: &CoreStep) -> usize {
        step.commands
            .iter()
            .filter(|c| matches!(c, CoreCommand::NotifyReload { .. }))
            .count()
    }

    #[test]
    fn served_change_while_idle_reloads_without_a_run() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        let step = core.step(served("dist/index.html"));
        assert_eq!(step.commands, vec![CoreCommand::NotifyReload { run_id: 0 }]);
        assert!(core.is_idle());

        core.step(change("a.js"));
        core.step(finished(1, RunOutcome::Success));
        let step = core.step(served("dist/index.html"));
        assert_eq!(step.commands, vec![CoreCommand::NotifyReload { run_id: 1 }]);
    }

    #[test]
    fn served_change_while_running_waits_for_the_run() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        core.step(change("a.js"));
        assert!(core.step(served("dist/index.html")).commands.is_empty());

        let step = core.step(finished(1, RunOutcome::Failed { stage: Some(StageName::Minify) }));
        assert_eq!(reloads(&step), 1);
        assert!(core.is_idle());

        core.step(change("a.js"));
        let step = core.step(finished(2, RunOutcome::Failed { stage: None }));
        assert_eq!(reloads(&step), 0);
    }

    #[test]
    fn served_change_and_success_reload_once() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        core.step(change("a.js"));
        core.step(served("dist/index.html"));
        let step = core.step(finished(1, RunOutcome::Success));
        assert_eq!(reloads(&step), 1);
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        core.step(change("a.js"));
        let step = core.step(finished(7, RunOutcome::Success));
        assert!(step.commands.is_empty());
        assert_eq!(core.state(), WatchState::Running { run_id: 1 });
    }

    #[test]
    fn exit_when_idle_stops_after_last_run() {
        let mut core = CoreRuntime::new(
            TaskGraph::full(),
            TriggerWhileRunningBehaviour::Queue,
            RuntimeOptions { exit_when_idle: true },
        );
        core.step(change("a.js"));
        core.step(change("b.js"));

        let step = core.step(finished(1, RunOutcome::Success));
        assert!(step.keep_running);

        let step = core.step(finished(2, RunOutcome::Success));
        assert!(!step.keep_running);
        assert_eq!(step.commands.last(), Some(&CoreCommand::RequestExit));
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(!step.keep_running);
    }
}
