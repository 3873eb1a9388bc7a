// src/errors.rs

//! Crate-wide error taxonomy.

use std::net::SocketAddr;

use thiserror::Error;

use crate::types::StageName;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required input pattern resolved to zero files.
    #[error("no files matched required pattern '{pattern}'")]
    NoMatch { pattern: String },

    /// An external capability failed while a stage was running.
    #[error("stage '{stage}' failed: {cause}")]
    Stage { stage: StageName, cause: String },

    /// The dev server could not acquire any port.
    #[error("could not bind dev server to {addr} ({attempts} attempt(s))")]
    Bind { addr: SocketAddr, attempts: u16 },

    #[error("file watcher error: {0}")]
    Watch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Wrap any displayable capability failure as a stage error.
    pub fn stage(stage: StageName, cause: impl std::fmt::Display) -> Self {
        PipelineError::Stage {
            stage,
            cause: cause.to_string(),
        }
    }

    /// The stage that failed, if this error came out of a stage.
    pub fn failed_stage(&self) -> Option<StageName> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<notify::Error> for PipelineError {
    fn from(err: notify::Error) -> Self {
        PipelineError::Watch(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
