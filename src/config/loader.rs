// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks globs, browser queries, required paths and the stage order.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration to use.
///
/// - An explicit path must exist and is loaded as-is.
/// - Otherwise `Assetpipe.toml` in the project root is used when present.
/// - Otherwise the built-in defaults apply.
pub fn load_or_default(
    explicit: Option<&Path>,
    root: &Path,
) -> Result<(ConfigFile, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((load_and_validate(path)?, Some(path.to_path_buf())));
    }

    let default_path = root.join(default_config_path());
    if default_path.is_file() {
        return Ok((load_and_validate(&default_path)?, Some(default_path)));
    }

    info!(
        path = %default_path.display(),
        "no config file found; using built-in defaults"
    );
    Ok((ConfigFile::try_from(RawConfigFile::default())?, None))
}

/// Default config file name, looked up in the project root.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Assetpipe.toml")
}
