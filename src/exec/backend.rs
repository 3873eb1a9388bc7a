// src/exec/backend.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::{RunOutcome, RuntimeEvent, ScheduledRun};
use crate::errors::Result;
use crate::pipeline::Orchestrator;

/// Trait abstracting how a scheduled run is executed.
///
/// Implementations must not wait for the run to finish: they report its
/// end later with `RuntimeEvent::RunFinished`, so the runtime keeps
/// receiving changes in the meantime.
pub trait PipelineBackend: Send {
    fn start_run(
        &mut self,
        run: ScheduledRun,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs the real orchestrator on the blocking thread pool.
pub struct RealPipelineBackend {
    orchestrator: Arc<Orchestrator>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RealPipelineBackend {
    pub fn new(orchestrator: Arc<Orchestrator>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            orchestrator,
            runtime_tx,
        }
    }
}

impl PipelineBackend for RealPipelineBackend {
    fn start_run(
        &mut self,
        run: ScheduledRun,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                let run_id = run.run_id;
                let graph = run.graph;
                let result =
                    tokio::task::spawn_blocking(move || orchestrator.run_all(&graph)).await;

                let outcome = match result {
                    Ok(Ok(report)) => {
                        info!(
                            run_id,
                            files = report.outputs().count(),
                            elapsed_ms = report.elapsed.as_millis() as u64,
                            "build finished"
                        );
                        RunOutcome::Success
                    }
                    Ok(Err(err)) => {
                        error!(run_id, error = %err, "build failed");
                        RunOutcome::Failed {
                            stage: err.failed_stage(),
                        }
                    }
                    Err(join_err) => {
                        error!(run_id, error = %join_err, "build task panicked");
                        RunOutcome::Failed { stage: None }
                    }
                };

                if let Err(err) = tx.send(RuntimeEvent::RunFinished { run_id, outcome }).await {
                    warn!("failed to send RuntimeEvent::RunFinished: {err}");
                }
            });
            Ok(())
        })
    }
}
