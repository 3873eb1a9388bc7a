// src/pipeline/mod.rs

//! The build pipeline: a fixed, linear sequence of stages.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::StageName;

pub mod capability;
pub mod collect;
mod css_scan;
pub mod orchestrator;
pub mod stages;

pub use collect::AssetCollector;
pub use orchestrator::{Capabilities, Orchestrator};
pub use stages::Stage;

/// Ordered list of stages one run executes.
///
/// Validation only ever produces the full pipeline, but runs are driven
/// by whatever graph they are handed, so tests can build shorter ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGraph {
    stages: Vec<StageName>,
}

impl TaskGraph {
    pub fn new(stages: Vec<StageName>) -> Self {
        Self { stages }
    }

    pub fn full() -> Self {
        Self::new(StageName::ALL.to_vec())
    }

    pub fn stages(&self) -> &[StageName] {
        &self.stages
    }

    pub fn iter(&self) -> impl Iterator<Item = StageName> + '_ {
        self.stages.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::full()
    }
}

impl fmt::Display for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(StageName::as_str).collect();
        write!(f, "{}", names.join(" -> "))
    }
}

/// Files one stage wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub stage: StageName,
    pub outputs: Vec<PathBuf>,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub artifacts: Vec<OutputArtifact>,
    pub elapsed: Duration,
}

impl RunReport {
    /// Every file written during the run, in write order.
    pub fn outputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.artifacts.iter().flat_map(|a| a.outputs.iter())
    }

    pub fn stages_run(&self) -> Vec<StageName> {
        self.artifacts.iter().map(|a| a.stage).collect()
    }
}
