// src/engine/queue.rs

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

use crate::types::TriggerWhileRunningBehaviour;

/// Changes that arrived while a run was in progress.
///
/// In `Queue` mode every such change is merged into a single pending batch,
/// so any number of triggers during one run produce at most one re-run.
/// In `Ignore` mode nothing is kept.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    pending: Option<BTreeSet<PathBuf>>,
}

impl TriggerQueue {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            behaviour,
            pending: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    /// Record a trigger seen mid-run. Returns whether it was kept.
    pub fn record(&mut self, paths: Vec<PathBuf>) -> bool {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                let batch = self.pending.get_or_insert_with(BTreeSet::new);
                batch.extend(paths);
                debug!(pending = batch.len(), "coalesced trigger into queued run");
                true
            }
            TriggerWhileRunningBehaviour::Ignore => {
                debug!(?paths, "run in progress; ignoring trigger");
                false
            }
        }
    }

    /// Take the pending batch, if any.
    pub fn drain(&mut self) -> Option<Vec<PathBuf>> {
        self.pending.take().map(|set| set.into_iter().collect())
    }
}
