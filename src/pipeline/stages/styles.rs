// src/pipeline/stages/styles.rs

use std::sync::Arc;

use super::{Stage, read_input, write_output};
use crate::config::CompileStylesConfig;
use crate::errors::{PipelineError, Result};
use crate::pipeline::capability::{StyleCompileOptions, StyleCompiler};
use crate::pipeline::{AssetCollector, OutputArtifact};
use crate::types::StageName;

/// Compiles the SCSS entry point into a single stylesheet.
#[derive(Debug, Clone)]
pub struct CompileStylesStage {
    collector: AssetCollector,
    config: CompileStylesConfig,
    compiler: Arc<dyn StyleCompiler>,
}

impl CompileStylesStage {
    pub fn new(
        collector: AssetCollector,
        config: CompileStylesConfig,
        compiler: Arc<dyn StyleCompiler>,
    ) -> Self {
        Self {
            collector,
            config,
            compiler,
        }
    }
}

impl Stage for CompileStylesStage {
    fn name(&self) -> StageName {
        StageName::CompileStyles
    }

    fn preflight(&self) -> Result<()> {
        self.collector.resolve_one(&self.config.src).map(|_| ())
    }

    fn apply(&self) -> Result<OutputArtifact> {
        let entry = self.collector.resolve_one(&self.config.src)?;
        let dest = self.collector.path(&self.config.dest);
        let fs = self.collector.fs();

        let source = read_input(fs, self.name(), &entry)?;

        // Partials next to the entry come first.
        let mut load_paths = Vec::with_capacity(self.config.load_paths.len() + 1);
        if let Some(dir) = entry.parent() {
            load_paths.push(dir.to_path_buf());
        }
        load_paths.extend(self.config.load_paths.iter().map(|p| self.collector.path(p)));

        let options = StyleCompileOptions {
            style: self.config.output_style,
            load_paths,
        };
        let css = self
            .compiler
            .compile(&source, &options)
            .map_err(|e| PipelineError::stage(self.name(), format!("{}: {e:#}", entry.display())))?;

        write_output(fs, self.name(), &dest, &css)?;

        Ok(OutputArtifact {
            stage: self.name(),
            outputs: vec![dest],
        })
    }
}
