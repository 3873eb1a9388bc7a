use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Name of a pipeline stage.
///
/// The declaration order is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum StageName {
    #[serde(rename = "concat")]
    Concat,
    #[serde(rename = "minify", alias = "uglify")]
    Minify,
    #[serde(rename = "compile-styles", alias = "sass")]
    CompileStyles,
    #[serde(rename = "prefix-styles", alias = "autoprefixer")]
    PrefixStyles,
}

impl StageName {
    /// Every stage, in the only order the pipeline ever runs them.
    pub const ALL: [StageName; 4] = [
        StageName::Concat,
        StageName::Minify,
        StageName::CompileStyles,
        StageName::PrefixStyles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Concat => "concat",
            StageName::Minify => "minify",
            StageName::CompileStyles => "compile-styles",
            StageName::PrefixStyles => "prefix-styles",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concat" => Ok(StageName::Concat),
            "minify" | "uglify" => Ok(StageName::Minify),
            "compile-styles" | "sass" => Ok(StageName::CompileStyles),
            "prefix-styles" | "autoprefixer" => Ok(StageName::PrefixStyles),
            other => Err(format!(
                "unknown stage: {other} (expected concat, minify, compile-styles or prefix-styles)"
            )),
        }
    }
}

/// Behaviour when a change arrives while a pipeline run is already in progress.
///
/// - `Queue`: coalesce every such change into a single pending re-run that
///   starts as soon as the current run finishes (default).
/// - `Ignore`: discard changes that arrive while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Ignore,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "ignore" => Ok(TriggerWhileRunningBehaviour::Ignore),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"ignore\")"
            )),
        }
    }
}

/// Mode for storing watch content hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashStorageMode {
    /// Store hashes in a file (`.assetpipe/hashes`).
    File,
    /// Store hashes in memory only (lost on restart).
    #[default]
    Memory,
}

/// Output style of the stylesheet compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StyleOutput {
    #[default]
    Compressed,
    Expanded,
}
