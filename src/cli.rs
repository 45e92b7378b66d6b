// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::PipelineKind;

/// Command-line arguments for `assetforge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetforge",
    version,
    about = "Bundle scripts and compile stylesheets, once or on every change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Relative paths inside it resolve against the file's directory.
    #[arg(long, value_name = "PATH", default_value = "Assetforge.toml")]
    pub config: String,

    /// Keep running and recompile whenever sources change.
    #[arg(long)]
    pub watch: bool,

    /// Announce development mode in the watch-started banner.
    #[arg(long)]
    pub development: bool,

    /// Only run one pipeline.
    #[arg(long, value_enum, value_name = "PIPELINE")]
    pub only: Option<OnlyPipeline>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFORGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the pipelines, but don't compile anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Pipeline selector for `--only`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OnlyPipeline {
    Scripts,
    Styles,
}

impl From<OnlyPipeline> for PipelineKind {
    fn from(value: OnlyPipeline) -> Self {
        match value {
            OnlyPipeline::Scripts => PipelineKind::Scripts,
            OnlyPipeline::Styles => PipelineKind::Styles,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::parse_from(["assetforge"]);
        assert_eq!(args.config, "Assetforge.toml");
        assert!(!args.watch);
        assert!(args.only.is_none());
        assert!(!args.dry_run);
        assert!(!args.development);
    }

    #[test]
    fn development_flag_parses() {
        let args = CliArgs::parse_from(["assetforge", "--watch", "--development"]);
        assert!(args.development);
    }

    #[test]
    fn only_selects_a_pipeline() {
        let args = CliArgs::parse_from(["assetforge", "--watch", "--only", "styles"]);
        assert!(args.watch);
        assert_eq!(args.only.map(PipelineKind::from), Some(PipelineKind::Styles));
    }
}
