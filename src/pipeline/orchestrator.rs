// src/pipeline/orchestrator.rs

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument};

use crate::config::ConfigFile;
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::pipeline::capability::{
    BrowserslistPolicy, GrassCompiler, LightningPrefixer, OxcMinifier, ScriptMinifier,
    StyleCompiler, StylePrefixer, TargetPolicy,
};
use crate::pipeline::stages::{
    CompileStylesStage, ConcatStage, MinifyStage, PrefixStylesStage, Stage,
};
use crate::pipeline::{AssetCollector, RunReport, TaskGraph};
use crate::types::StageName;

/// The external transformers the stages delegate to.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub minifier: Arc<dyn ScriptMinifier>,
    pub compiler: Arc<dyn StyleCompiler>,
    pub prefixer: Arc<dyn StylePrefixer>,
    pub targets: Arc<dyn TargetPolicy>,
}

impl Capabilities {
    /// oxc, grass and lightningcss, with targets from the configured queries.
    pub fn standard(cfg: &ConfigFile) -> Self {
        Self {
            minifier: Arc::new(OxcMinifier),
            compiler: Arc::new(GrassCompiler),
            prefixer: Arc::new(LightningPrefixer),
            targets: Arc::new(BrowserslistPolicy::new(cfg.prefix_styles().browsers.clone())),
        }
    }
}

/// Runs stages in graph order and stops at the first failure.
pub struct Orchestrator {
    stages: Vec<Box<dyn Stage>>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// All four stages, wired to the real transformers.
    pub fn from_config(cfg: &ConfigFile, root: &Path, fs: Arc<dyn FileSystem>) -> Self {
        Self::with_capabilities(cfg, AssetCollector::new(fs, root), Capabilities::standard(cfg))
    }

    pub fn with_capabilities(cfg: &ConfigFile, collector: AssetCollector, caps: Capabilities) -> Self {
        Self::new()
            .with_stage(ConcatStage::new(collector.clone(), cfg.concat().clone()))
            .with_stage(MinifyStage::new(
                collector.clone(),
                cfg.minify().clone(),
                caps.minifier,
            ))
            .with_stage(CompileStylesStage::new(
                collector.clone(),
                cfg.compile_styles().clone(),
                caps.compiler,
            ))
            .with_stage(PrefixStylesStage::new(
                collector,
                cfg.prefix_styles().clone(),
                caps.prefixer,
                caps.targets,
            ))
    }

    /// Register a stage, replacing any stage with the same name.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        let name = stage.name();
        self.stages.retain(|s| s.name() != name);
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    fn stage(&self, name: StageName) -> Result<&dyn Stage> {
        self.stages
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
            .ok_or_else(|| PipelineError::Config(format!("no stage registered for '{name}'")))
    }

    /// Run every stage of `graph`, in order.
    ///
    /// All stages are preflighted first, so a missing required input fails
    /// the run before any output is written.
    #[instrument(level = "debug", skip_all, fields(graph = %graph))]
    pub fn run_all(&self, graph: &TaskGraph) -> Result<RunReport> {
        let started = Instant::now();

        let mut plan = Vec::with_capacity(graph.len());
        for name in graph.iter() {
            plan.push(self.stage(name)?);
        }
        for stage in &plan {
            stage.preflight()?;
        }

        let mut report = RunReport::default();
        for stage in plan {
            let stage_started = Instant::now();
            info!(stage = %stage.name(), "running stage");
            match stage.apply() {
                Ok(artifact) => {
                    info!(
                        stage = %stage.name(),
                        outputs = artifact.outputs.len(),
                        elapsed_ms = stage_started.elapsed().as_millis() as u64,
                        "stage finished"
                    );
                    report.artifacts.push(artifact);
                }
                Err(err) => {
                    error!(stage = %stage.name(), error = %err, "stage failed");
                    return Err(err);
                }
            }
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }
}
