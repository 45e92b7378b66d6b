#![allow(dead_code)]

use std::path::PathBuf;

use assetforge::config::{ConfigFile, GlobalSection, PipelineConfig, RawConfigFile};
use assetforge::types::{ChangeWhileCompiling, OutputStyle};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: GlobalSection::default(),
                scripts: None,
                styles: None,
            },
        }
    }

    pub fn scripts(mut self, pipeline: PipelineConfig) -> Self {
        self.config.scripts = Some(pipeline);
        self
    }

    pub fn styles(mut self, pipeline: PipelineConfig) -> Self {
        self.config.styles = Some(pipeline);
        self
    }

    pub fn changes_while_compiling(mut self, policy: ChangeWhileCompiling) -> Self {
        self.config.config.changes_while_compiling = policy;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.config.config.use_hash = val;
        self
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

/// Builder for `PipelineConfig`.
pub struct PipelineConfigBuilder {
    pipeline: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new(path: &str, file: &str, output: &str) -> Self {
        Self {
            pipeline: PipelineConfig::new(path, file, output),
        }
    }

    pub fn source_map(mut self, val: bool) -> Self {
        self.pipeline.compiler.source_map = val;
        self
    }

    pub fn output_style(mut self, style: OutputStyle) -> Self {
        self.pipeline.compiler.output_style = style;
        self
    }

    pub fn load_path(mut self, path: &str) -> Self {
        self.pipeline.compiler.load_paths.push(PathBuf::from(path));
        self
    }

    pub fn target(mut self, target: &str) -> Self {
        self.pipeline.compiler.target = Some(target.to_string());
        self
    }

    pub fn extension(mut self, ext: &str) -> Self {
        self.pipeline.compiler.extensions.push(ext.to_string());
        self
    }

    pub fn watch_extra(mut self, path: &str) -> Self {
        self.pipeline.watch_extra.push(PathBuf::from(path));
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.pipeline.exclude.push(pattern.to_string());
        self
    }

    pub fn notifications(mut self, val: bool) -> Self {
        self.pipeline.notifications = val;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.pipeline
    }
}
