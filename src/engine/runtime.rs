// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::PipelineBackend;
use crate::server::Reloader;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Async shell around [`CoreRuntime`].
///
/// Reads events, feeds them to the core and carries out the returned
/// commands: runs go to the `PipelineBackend`, reloads to the `Reloader`.
pub struct Runtime<B: PipelineBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: B,
    reloader: Option<Reloader>,
}

impl<B: PipelineBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("livereload", &self.reloader.is_some())
            .finish_non_exhaustive()
    }
}

impl<B: PipelineBackend> Runtime<B> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        backend: B,
        reloader: Option<Reloader>,
    ) -> Self {
        Self {
            core,
            event_rx,
            backend,
            reloader,
        }
    }

    /// Main event loop. Returns when the core asks to stop or every event
    /// sender is gone.
    pub async fn run(mut self) -> Result<()> {
        info!("rebuild runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::StartRun(run) => {
                debug!(run_id = run.run_id, changed = run.changed.len(), reason = ?run.reason, "starting run");
                self.backend.start_run(run).await?;
            }
            CoreCommand::NotifyReload { run_id } => {
                if let Some(reloader) = &self.reloader {
                    let clients = reloader.notify(run_id);
                    debug!(run_id, clients, "reload broadcast");
                }
            }
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }
}
