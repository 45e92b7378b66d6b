// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

use crate::types::{ChangeWhileCompiling, OutputStyle, PipelineKind};

/// Configuration as read from `Assetforge.toml`, before validation.
///
/// ```toml
/// [config]
/// changes_while_compiling = "queue"
///
/// [scripts]
/// path = "src/scripts"
/// file = "main.js"
/// output = "build/js/bundle.js"
///
/// [styles]
/// path = "src/styles"
/// file = "main.scss"
/// output = "build/css/styles.css"
/// watch_extra = "config/tokens.yml"
///
/// [styles.compiler]
/// source_map = true
/// ```
///
/// `[config]` is optional; at least one pipeline section is required (checked
/// in `validate.rs`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: GlobalSection,

    #[serde(default)]
    pub scripts: Option<PipelineConfig>,

    #[serde(default)]
    pub styles: Option<PipelineConfig>,
}

/// Validated configuration. Only constructed through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: GlobalSection,
    pub scripts: Option<PipelineConfig>,
    pub styles: Option<PipelineConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: GlobalSection,
        scripts: Option<PipelineConfig>,
        styles: Option<PipelineConfig>,
    ) -> Self {
        Self {
            config,
            scripts,
            styles,
        }
    }

    /// Configured pipelines, scripts first.
    pub fn pipelines(&self) -> impl Iterator<Item = (PipelineKind, &PipelineConfig)> {
        self.scripts
            .iter()
            .map(|c| (PipelineKind::Scripts, c))
            .chain(self.styles.iter().map(|c| (PipelineKind::Styles, c)))
    }

    pub fn pipeline(&self, kind: PipelineKind) -> Option<&PipelineConfig> {
        match kind {
            PipelineKind::Scripts => self.scripts.as_ref(),
            PipelineKind::Styles => self.styles.as_ref(),
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSection {
    /// `"queue"` (default) or `"drop"`.
    #[serde(default)]
    pub changes_while_compiling: ChangeWhileCompiling,

    /// Skip recompiles for change events whose file content did not change.
    #[serde(default)]
    pub use_hash: bool,
}

/// `[scripts]` / `[styles]` section: one entry point, one artifact.
///
/// All relative paths resolve against the project root (the directory of
/// the config file).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Source directory.
    pub path: PathBuf,

    /// Entry file inside `path`.
    pub file: String,

    /// Artifact path. A source map, when enabled, is written next to it as
    /// `<output>.map`.
    pub output: PathBuf,

    #[serde(default)]
    pub compiler: CompilerOptions,

    /// Extra paths to watch besides `path`. A single string is accepted.
    #[serde(default, deserialize_with = "one_or_many")]
    pub watch_extra: Vec<PathBuf>,

    /// Globs (relative to the project root) whose changes never trigger a
    /// recompile.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Print a one-line notice on stdout after each compile, including a
    /// failed one.
    #[serde(default)]
    pub notifications: bool,
}

impl PipelineConfig {
    pub fn new(path: impl Into<PathBuf>, file: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: file.into(),
            output: output.into(),
            compiler: CompilerOptions::default(),
            watch_extra: Vec::new(),
            exclude: Vec::new(),
            notifications: false,
        }
    }

    /// Entry point relative to the project root: `path/file`.
    pub fn entry(&self) -> PathBuf {
        self.path.join(&self.file)
    }
}

/// Options handed to the underlying compiler.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompilerOptions {
    #[serde(default)]
    pub source_map: bool,

    /// Styles only.
    #[serde(default)]
    pub output_style: OutputStyle,

    /// Styles only: extra directories searched for `@import`, data file
    /// imports included.
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,

    /// Scripts only: what the bundle has to run on. `es5` when unset.
    #[serde(default)]
    pub target: Option<String>,

    /// Scripts only: extensions tried after `js`, `mjs`, `cjs` and `json`
    /// when a module request names no file, e.g. `[".es6"]`.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Keys this crate does not interpret. Kept so configs written for other
    /// tools still load; logged at debug level when compiling.
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(PathBuf),
        Many(Vec<PathBuf>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(p) => vec![p],
        OneOrMany::Many(v) => v,
    })
}
