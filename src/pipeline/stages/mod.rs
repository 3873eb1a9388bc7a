// src/pipeline/stages/mod.rs

use std::fmt::Debug;
use std::path::{Component, Path};

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::pipeline::OutputArtifact;
use crate::types::StageName;

mod concat;
mod minify;
mod prefix;
mod styles;

pub use concat::ConcatStage;
pub use minify::MinifyStage;
pub use prefix::PrefixStylesStage;
pub use styles::CompileStylesStage;

/// One step of the pipeline.
pub trait Stage: Send + Sync + Debug {
    fn name(&self) -> StageName;

    /// Check inputs that must exist before the run starts. Called for every
    /// stage before any stage is applied.
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Read inputs, transform, write outputs.
    fn apply(&self) -> Result<OutputArtifact>;
}

fn read_input(fs: &dyn FileSystem, stage: StageName, path: &Path) -> Result<String> {
    fs.read_to_string(path)
        .map_err(|e| PipelineError::stage(stage, format!("{e:#}")))
}

fn write_output(fs: &dyn FileSystem, stage: StageName, path: &Path, contents: &str) -> Result<()> {
    fs.write(path, contents.as_bytes())
        .map_err(|e| PipelineError::stage(stage, format!("{e:#}")))
}

/// File name component used in `sourceMappingURL` comments.
fn map_file_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{name}.map")
}

fn map_path(path: &Path) -> std::path::PathBuf {
    path.with_file_name(map_file_name(path))
}

/// `target` as a `/`-separated path seen from the directory `from_dir`.
/// Both are relative to the same root.
fn relative_from(from_dir: &Path, target: &Path) -> String {
    let from = normal_components(from_dir);
    let to = normal_components(target);
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts = vec!["..".to_string(); from.len() - common];
    parts.extend(to[common..].iter().cloned());
    parts.join("/")
}

fn normal_components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_from_sibling_and_distant_dirs() {
        assert_eq!(relative_from(Path::new("dist/js"), Path::new("dist/js/scripts.js")), "scripts.js");
        assert_eq!(relative_from(Path::new("./dist/js"), Path::new("src/app.js")), "../../src/app.js");
        assert_eq!(relative_from(Path::new(""), Path::new("app.js")), "app.js");
    }
}
