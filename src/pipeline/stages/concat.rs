// src/pipeline/stages/concat.rs

use tracing::{debug, warn};

use super::{Stage, read_input, write_output};
use crate::config::ConcatConfig;
use crate::errors::Result;
use crate::pipeline::{AssetCollector, OutputArtifact};
use crate::types::StageName;

/// Joins every matched script into one file:
/// `banner + join(separator, contents) + footer`.
#[derive(Debug, Clone)]
pub struct ConcatStage {
    collector: AssetCollector,
    config: ConcatConfig,
}

impl ConcatStage {
    pub fn new(collector: AssetCollector, config: ConcatConfig) -> Self {
        Self { collector, config }
    }
}

impl Stage for ConcatStage {
    fn name(&self) -> StageName {
        StageName::Concat
    }

    fn apply(&self) -> Result<OutputArtifact> {
        let dest = self.collector.path(&self.config.dest);
        let mut files = self.collector.resolve_all(&self.config.src)?;
        // A broad pattern may pick up the previous output.
        files.retain(|f| *f != dest);

        if files.is_empty() {
            warn!(patterns = ?self.config.src, "concat matched no files; writing banner and footer only");
        }

        let mut parts = Vec::with_capacity(files.len());
        for file in &files {
            debug!(file = ?file, "concat input");
            parts.push(read_input(self.collector.fs(), self.name(), file)?);
        }

        let mut out = String::with_capacity(
            self.config.banner.len()
                + self.config.footer.len()
                + parts.iter().map(String::len).sum::<usize>(),
        );
        out.push_str(&self.config.banner);
        out.push_str(&parts.join(&self.config.separator));
        out.push_str(&self.config.footer);

        write_output(self.collector.fs(), self.name(), &dest, &out)?;

        Ok(OutputArtifact {
            stage: self.name(),
            outputs: vec![dest],
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn stage(fs: &MockFileSystem, config: ConcatConfig) -> ConcatStage {
        ConcatStage::new(AssetCollector::new(Arc::new(fs.clone()), "."), config)
    }

    #[test]
    fn joins_sorted_inputs_with_banner_and_footer() {
        let fs = MockFileSystem::new();
        fs.add_file("./components/scripts/b.js", "B");
        fs.add_file("./components/scripts/a.js", "A");

        let config = ConcatConfig {
            separator: ";".to_string(),
            banner: "/*x*/".to_string(),
            footer: "//end".to_string(),
            ..ConcatConfig::default()
        };
        let artifact = stage(&fs, config).apply().unwrap();

        assert_eq!(artifact.stage, StageName::Concat);
        assert_eq!(fs.contents("./dist/js/scripts.js").unwrap(), "/*x*/A;B//end");
    }

    #[test]
    fn zero_matches_writes_empty_output() {
        let fs = MockFileSystem::new();
        stage(&fs, ConcatConfig::default()).apply().unwrap();
        assert_eq!(fs.contents("./dist/js/scripts.js").unwrap(), "");
    }

    #[test]
    fn previous_output_is_not_an_input() {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/js/a.js", "A");
        fs.add_file("./dist/js/scripts.js", "stale");

        let config = ConcatConfig {
            src: vec!["dist/js/*.js".to_string()],
            ..ConcatConfig::default()
        };
        stage(&fs, config).apply().unwrap();
        assert_eq!(fs.contents("./dist/js/scripts.js").unwrap(), "A");
    }
}
