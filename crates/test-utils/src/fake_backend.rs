use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use assetpipe::engine::{RunOutcome, RuntimeEvent, ScheduledRun};
use assetpipe::errors::Result;
use assetpipe::exec::PipelineBackend;

/// A fake backend that:
/// - records every run it was asked to start
/// - reports `RunFinished` with `outcome` after `delay`, without blocking
///   the runtime in the meantime.
pub struct FakeBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    started: Arc<Mutex<Vec<ScheduledRun>>>,
    delay: Duration,
    outcome: RunOutcome,
}

impl FakeBackend {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        started: Arc<Mutex<Vec<ScheduledRun>>>,
        delay: Duration,
    ) -> Self {
        Self {
            runtime_tx,
            started,
            delay,
            outcome: RunOutcome::Success,
        }
    }

    pub fn failing(mut self, outcome: RunOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

impl PipelineBackend for FakeBackend {
    fn start_run(
        &mut self,
        run: ScheduledRun,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let started = Arc::clone(&self.started);
        let delay = self.delay;
        let outcome = self.outcome;

        Box::pin(async move {
            let run_id = run.run_id;
            started.lock().unwrap().push(run);

            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(RuntimeEvent::RunFinished { run_id, outcome }).await;
            });
            Ok(())
        })
    }
}
