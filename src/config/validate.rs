// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};
use crate::pipeline::capability::{BrowserslistPolicy, TargetPolicy};
use crate::pipeline::TaskGraph;
use crate::types::StageName;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let graph = validate_task_order(&raw.watch.tasks)?;
        Ok(ConfigFile::new_unchecked(raw, graph))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_patterns(cfg)?;
    validate_browsers(cfg)?;
    validate_server(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let outputs = [
        ("[concat].dest", cfg.concat.dest.as_os_str().is_empty()),
        ("[minify].src", cfg.minify.src.as_os_str().is_empty()),
        ("[minify].dest", cfg.minify.dest.as_os_str().is_empty()),
        ("[compile_styles].src", cfg.compile_styles.src.trim().is_empty()),
        ("[compile_styles].dest", cfg.compile_styles.dest.as_os_str().is_empty()),
    ];

    for (key, empty) in outputs {
        if empty {
            return Err(PipelineError::Config(format!("{key} must not be empty")));
        }
    }

    if cfg.minify.src == cfg.minify.dest {
        return Err(PipelineError::Config(
            "[minify].dest must differ from [minify].src".to_string(),
        ));
    }

    Ok(())
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    let groups: [(&str, &[String]); 4] = [
        ("[concat].src", &cfg.concat.src),
        ("[prefix_styles].src", &cfg.prefix_styles.src),
        ("[watch].files", &cfg.watch.files),
        ("[watch].exclude", &cfg.watch.exclude),
    ];

    for (key, patterns) in groups {
        for pat in patterns {
            Glob::new(pat).map_err(|e| {
                PipelineError::Config(format!("{key} has invalid glob '{pat}': {e}"))
            })?;
        }
    }

    Glob::new(&cfg.compile_styles.src).map_err(|e| {
        PipelineError::Config(format!(
            "[compile_styles].src is not a valid path or pattern '{}': {e}",
            cfg.compile_styles.src
        ))
    })?;

    Ok(())
}

fn validate_browsers(cfg: &RawConfigFile) -> Result<()> {
    if cfg.prefix_styles.browsers.is_empty() {
        return Err(PipelineError::Config(
            "[prefix_styles].browsers must contain at least one query".to_string(),
        ));
    }

    BrowserslistPolicy::new(cfg.prefix_styles.browsers.clone())
        .targets()
        .map_err(|e| PipelineError::Config(format!("[prefix_styles].browsers: {e}")))?;

    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.hostname.trim().is_empty() {
        return Err(PipelineError::Config(
            "[server].hostname must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// The watcher may only re-run the whole pipeline, in canonical order.
fn validate_task_order(tasks: &[StageName]) -> Result<TaskGraph> {
    if tasks != StageName::ALL {
        let got: Vec<&str> = tasks.iter().map(|s| s.as_str()).collect();
        let expected: Vec<&str> = StageName::ALL.iter().map(|s| s.as_str()).collect();
        return Err(PipelineError::Config(format!(
            "[watch].tasks must list every stage in pipeline order {expected:?} (got {got:?})"
        )));
    }
    Ok(TaskGraph::new(tasks.to_vec()))
}
