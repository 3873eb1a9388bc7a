// src/pipeline/stages/prefix.rs

use std::sync::Arc;

use tracing::{debug, warn};

use super::{Stage, map_file_name, map_path, read_input, write_output};
use crate::config::PrefixStylesConfig;
use crate::errors::{PipelineError, Result};
use crate::pipeline::capability::{StylePrefixer, TargetPolicy};
use crate::pipeline::{AssetCollector, OutputArtifact};
use crate::types::StageName;

/// Rewrites every matched stylesheet in place with the vendor prefixes the
/// configured browsers need.
#[derive(Debug, Clone)]
pub struct PrefixStylesStage {
    collector: AssetCollector,
    config: PrefixStylesConfig,
    prefixer: Arc<dyn StylePrefixer>,
    policy: Arc<dyn TargetPolicy>,
}

impl PrefixStylesStage {
    pub fn new(
        collector: AssetCollector,
        config: PrefixStylesConfig,
        prefixer: Arc<dyn StylePrefixer>,
        policy: Arc<dyn TargetPolicy>,
    ) -> Self {
        Self {
            collector,
            config,
            prefixer,
            policy,
        }
    }
}

impl Stage for PrefixStylesStage {
    fn name(&self) -> StageName {
        StageName::PrefixStyles
    }

    fn apply(&self) -> Result<OutputArtifact> {
        let fs = self.collector.fs();
        let files: Vec<_> = self
            .collector
            .resolve_all(&self.config.src)?
            .into_iter()
            .filter(|f| f.extension().is_none_or(|ext| ext != "map"))
            .collect();

        if files.is_empty() {
            warn!(patterns = ?self.config.src, "prefix-styles matched no files");
        }

        let browsers = self
            .policy
            .targets()
            .map_err(|e| PipelineError::stage(self.name(), format!("{e:#}")))?;

        let mut outputs = Vec::new();
        for file in files {
            let css = read_input(fs, self.name(), &file)?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let prefixed = self
                .prefixer
                .prefix(&css, &file_name, browsers, self.config.map)
                .map_err(|e| PipelineError::stage(self.name(), format!("{e:#}")))?;

            let mut code = prefixed.code;
            if let Some(map) = prefixed.map.filter(|_| self.config.map) {
                let map_dest = map_path(&file);
                write_output(fs, self.name(), &map_dest, &map)?;
                if !code.ends_with('\n') {
                    code.push('\n');
                }
                code.push_str(&format!("/*# sourceMappingURL={} */", map_file_name(&file)));
                outputs.push(map_dest);
            }

            write_output(fs, self.name(), &file, &code)?;
            debug!(file = ?file, "prefixed stylesheet");
            outputs.push(file);
        }

        Ok(OutputArtifact {
            stage: self.name(),
            outputs,
        })
    }
}
