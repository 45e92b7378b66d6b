// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and deserialize a config file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Read, deserialize and validate a config file.
///
/// Defaults for omitted fields are applied by `serde`; validation rejects
/// configs without any pipeline, empty entry/output fields, invalid exclude
/// globs and two pipelines writing the same artifact.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    debug!(path = ?path.as_ref(), "config loaded");
    Ok(config)
}

/// Parse and validate config text directly (used by tests and embedders).
pub fn load_from_str(text: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(text)?;
    ConfigFile::try_from(raw)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("Assetforge.toml")
}
