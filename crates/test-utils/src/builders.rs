#![allow(dead_code)]

use std::path::PathBuf;

use assetpipe::config::{ConfigFile, RawConfigFile};
use assetpipe::types::{HashStorageMode, StageName, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults; every `with_*` overrides one key.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_concat(mut self, src: &[&str], dest: &str) -> Self {
        self.config.concat.src = src.iter().map(|s| s.to_string()).collect();
        self.config.concat.dest = PathBuf::from(dest);
        self
    }

    pub fn with_separator(mut self, separator: &str) -> Self {
        self.config.concat.separator = separator.to_string();
        self
    }

    pub fn with_minify(mut self, src: &str, dest: &str) -> Self {
        self.config.minify.src = PathBuf::from(src);
        self.config.minify.dest = PathBuf::from(dest);
        self
    }

    pub fn with_script_map(mut self, on: bool) -> Self {
        self.config.minify.source_map = on;
        self
    }

    pub fn with_styles(mut self, src: &str, dest: &str) -> Self {
        self.config.compile_styles.src = src.to_string();
        self.config.compile_styles.dest = PathBuf::from(dest);
        self
    }

    pub fn with_prefix(mut self, src: &[&str], browsers: &[&str]) -> Self {
        self.config.prefix_styles.src = src.iter().map(|s| s.to_string()).collect();
        self.config.prefix_styles.browsers = browsers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_style_map(mut self, on: bool) -> Self {
        self.config.prefix_styles.map = on;
        self
    }

    pub fn with_port(mut self, port: u16, use_available_port: bool) -> Self {
        self.config.server.port = port;
        self.config.server.use_available_port = use_available_port;
        self
    }

    pub fn with_base(mut self, base: &str) -> Self {
        self.config.server.base = PathBuf::from(base);
        self
    }

    pub fn with_watch(mut self, files: &[&str]) -> Self {
        self.config.watch.files = files.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_exclude(mut self, patterns: &[&str]) -> Self {
        self.config.watch.exclude = patterns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_tasks(mut self, tasks: &[StageName]) -> Self {
        self.config.watch.tasks = tasks.to_vec();
        self
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.watch.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn with_use_hash(mut self, on: bool, mode: HashStorageMode) -> Self {
        self.config.watch.use_hash = on;
        self.config.watch.hash_storage_mode = mode;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
