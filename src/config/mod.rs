// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed data model, raw and validated.
//! - `loader.rs`: read a config file from disk (or fall back to defaults).
//! - `validate.rs`: `RawConfigFile` → `ConfigFile` checks.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    CompileStylesConfig, ConcatConfig, ConfigFile, MinifyConfig, PrefixStylesConfig,
    RawConfigFile, ServerConfig, WatchConfig,
};
