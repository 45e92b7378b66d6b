// src/config/mod.rs

//! Typed configuration loaded from TOML.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{CompilerOptions, ConfigFile, GlobalSection, PipelineConfig, RawConfigFile};
