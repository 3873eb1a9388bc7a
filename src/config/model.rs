// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::pipeline::TaskGraph;
use crate::types::{HashStorageMode, StageName, StyleOutput, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// Every section and key is optional; the defaults reproduce the classic
/// `components/` → `dist/` layout:
///
/// ```toml
/// [concat]
/// src = ["components/scripts/*.js"]
/// dest = "dist/js/scripts.js"
///
/// [compile_styles]
/// src = "components/scss/styles.scss"
/// dest = "dist/css/styles.min.css"
/// output_style = "compressed"
///
/// [prefix_styles]
/// browsers = ["last 4 versions"]
///
/// [server]
/// port = 8000
/// use_available_port = true
///
/// [watch]
/// files = ["components/scripts/*.js", "components/scss/*.scss"]
/// tasks = ["concat", "uglify", "sass", "autoprefixer"]
/// ```
///
/// This is the unvalidated form; see [`ConfigFile`] for the checked one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub concat: ConcatConfig,
    #[serde(default)]
    pub minify: MinifyConfig,
    #[serde(default)]
    pub compile_styles: CompileStylesConfig,
    #[serde(default)]
    pub prefix_styles: PrefixStylesConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// `[concat]` section: join every matched script into one file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConcatConfig {
    /// Glob patterns, relative to the project root. Zero matches is allowed.
    pub src: Vec<String>,
    pub dest: PathBuf,
    /// Inserted between two consecutive files.
    pub separator: String,
    /// Prepended once to the output.
    pub banner: String,
    /// Appended once to the output.
    pub footer: String,
}

impl Default for ConcatConfig {
    fn default() -> Self {
        Self {
            src: vec!["components/scripts/*.js".to_string()],
            dest: PathBuf::from("dist/js/scripts.js"),
            separator: "\n".to_string(),
            banner: String::new(),
            footer: String::new(),
        }
    }
}

/// `[minify]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MinifyConfig {
    pub src: PathBuf,
    pub dest: PathBuf,
    /// Write `<dest>.map` and link it from the minified file.
    pub source_map: bool,
    /// Shorten local identifiers.
    pub mangle: bool,
    /// Apply compressing rewrites (dead code, constant folding, ...).
    pub compress: bool,
}

impl Default for MinifyConfig {
    fn default() -> Self {
        Self {
            src: PathBuf::from("dist/js/scripts.js"),
            dest: PathBuf::from("dist/js/scripts.min.js"),
            source_map: true,
            mangle: true,
            compress: true,
        }
    }
}

/// `[compile_styles]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompileStylesConfig {
    /// Entry point; a path or a pattern that must match exactly one file.
    pub src: String,
    pub dest: PathBuf,
    pub output_style: StyleOutput,
    /// Extra directories searched by `@use` / `@import`, relative to the root.
    pub load_paths: Vec<PathBuf>,
}

impl Default for CompileStylesConfig {
    fn default() -> Self {
        Self {
            src: "components/scss/styles.scss".to_string(),
            dest: PathBuf::from("dist/css/styles.min.css"),
            output_style: StyleOutput::Compressed,
            load_paths: Vec::new(),
        }
    }
}

/// `[prefix_styles]` section. Matched files are rewritten in place.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrefixStylesConfig {
    pub src: Vec<String>,
    /// Browserslist queries, e.g. `"last 4 versions"`.
    pub browsers: Vec<String>,
    /// Write `<file>.map` next to every prefixed file.
    pub map: bool,
}

impl Default for PrefixStylesConfig {
    fn default() -> Self {
        Self {
            src: vec!["dist/css/*.css".to_string()],
            browsers: vec!["last 4 versions".to_string()],
            map: true,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    /// Probe the following ports when `port` is taken.
    pub use_available_port: bool,
    /// How many ports after `port` may be probed.
    pub port_search_limit: u16,
    /// Directory served as the web root, relative to the project root.
    pub base: PathBuf,
    pub livereload: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port: 8000,
            use_available_port: true,
            port_search_limit: 30,
            base: PathBuf::from("dist"),
            livereload: true,
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Glob patterns whose changes re-run the pipeline.
    pub files: Vec<String>,
    /// Glob patterns that never trigger a run, even if listed in `files`.
    pub exclude: Vec<String>,
    /// Stages re-run on change. Must be the full pipeline, in order.
    pub tasks: Vec<StageName>,
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,
    /// Quiet period used to batch the burst of events a single save produces.
    pub debounce_ms: u64,
    /// Only trigger when the watched contents actually changed.
    pub use_hash: bool,
    pub hash_storage_mode: HashStorageMode,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            files: vec![
                "components/scripts/*.js".to_string(),
                "components/scss/*.scss".to_string(),
            ],
            exclude: vec!["dist/**".to_string()],
            tasks: StageName::ALL.to_vec(),
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::Queue,
            debounce_ms: 100,
            use_hash: false,
            hash_storage_mode: HashStorageMode::Memory,
        }
    }
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `config::validate`),
/// so holders can rely on the invariants checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    concat: ConcatConfig,
    minify: MinifyConfig,
    compile_styles: CompileStylesConfig,
    prefix_styles: PrefixStylesConfig,
    server: ServerConfig,
    watch: WatchConfig,
    graph: TaskGraph,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, graph: TaskGraph) -> Self {
        Self {
            concat: raw.concat,
            minify: raw.minify,
            compile_styles: raw.compile_styles,
            prefix_styles: raw.prefix_styles,
            server: raw.server,
            watch: raw.watch,
            graph,
        }
    }

    pub fn concat(&self) -> &ConcatConfig {
        &self.concat
    }

    pub fn minify(&self) -> &MinifyConfig {
        &self.minify
    }

    pub fn compile_styles(&self) -> &CompileStylesConfig {
        &self.compile_styles
    }

    pub fn prefix_styles(&self) -> &PrefixStylesConfig {
        &self.prefix_styles
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn watch(&self) -> &WatchConfig {
        &self.watch
    }

    /// Stage order re-run by the watcher (and by `build`).
    pub fn task_graph(&self) -> &TaskGraph {
        &self.graph
    }
}
