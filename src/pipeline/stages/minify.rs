// src/pipeline/stages/minify.rs

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::{Stage, map_file_name, map_path, read_input, relative_from, write_output};
use crate::config::MinifyConfig;
use crate::errors::{PipelineError, Result};
use crate::pipeline::capability::{ScriptMinifier, ScriptOptions};
use crate::pipeline::{AssetCollector, OutputArtifact};
use crate::types::StageName;

/// Minifies the concatenated script, optionally with a linked source map.
#[derive(Debug, Clone)]
pub struct MinifyStage {
    collector: AssetCollector,
    config: MinifyConfig,
    minifier: Arc<dyn ScriptMinifier>,
}

impl MinifyStage {
    pub fn new(collector: AssetCollector, config: MinifyConfig, minifier: Arc<dyn ScriptMinifier>) -> Self {
        Self {
            collector,
            config,
            minifier,
        }
    }
}

impl Stage for MinifyStage {
    fn name(&self) -> StageName {
        StageName::Minify
    }

    fn apply(&self) -> Result<OutputArtifact> {
        let src = self.collector.path(&self.config.src);
        let dest = self.collector.path(&self.config.dest);
        let fs = self.collector.fs();

        if !fs.is_file(&src) {
            return Err(PipelineError::NoMatch {
                pattern: self.config.src.to_string_lossy().into_owned(),
            });
        }

        let source = read_input(fs, self.name(), &src)?;
        // The map sits next to `dest`, so its source is named from there.
        let map_dir = self.config.dest.parent().unwrap_or(Path::new(""));
        let file_name = relative_from(map_dir, &self.config.src);
        let options = ScriptOptions {
            mangle: self.config.mangle,
            compress: self.config.compress,
            source_map: self.config.source_map,
        };

        let minified = self
            .minifier
            .minify(&source, &file_name, options)
            .map_err(|e| PipelineError::stage(self.name(), format!("{e:#}")))?;
        debug!(before = source.len(), after = minified.code.len(), "minified script");

        let mut outputs = vec![dest.clone()];
        let mut code = minified.code;

        if let Some(map) = minified.map.filter(|_| self.config.source_map) {
            let map_dest = map_path(&dest);
            write_output(fs, self.name(), &map_dest, &map)?;
            if !code.ends_with('\n') {
                code.push('\n');
            }
            code.push_str(&format!("//# sourceMappingURL={}", map_file_name(&dest)));
            outputs.push(map_dest);
        }

        write_output(fs, self.name(), &dest, &code)?;

        Ok(OutputArtifact {
            stage: self.name(),
            outputs,
        })
    }
}
