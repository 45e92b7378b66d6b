// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod paths;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod script;
pub mod sourcemap;
pub mod style;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile};
use crate::errors::AssetforgeError;
use crate::paths::ProjectPaths;
use crate::report::TracingReporter;
use crate::types::PipelineKind;

pub use crate::orchestrator::{Orchestrator, StartOptions};
pub use crate::pipeline::{CompilationResult, Pipeline};
pub use crate::script::ScriptPipeline;
pub use crate::style::StylePipeline;
pub use crate::watch::{SessionHandle, WatchSession};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the orchestrator and its pipelines
/// - (optional) watch sessions
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let only = args.only.map(PipelineKind::from);

    if let Some(kind) = only {
        if cfg.pipeline(kind).is_none() {
            return Err(AssetforgeError::ConfigError(format!(
                "--only {kind}: no [{kind}] section in {}",
                config_path.display()
            ))
            .into());
        }
    }

    if args.dry_run {
        print_dry_run(&cfg, only);
        return Ok(());
    }

    let root = config_root_dir(&config_path);
    info!(?root, "project root");

    let orchestrator = Orchestrator::new(ProjectPaths::new(root), cfg, Arc::new(TracingReporter));
    let mut sessions = orchestrator
        .start(StartOptions {
            watch: args.watch,
            only,
            development: args.development,
        })
        .await?;

    if sessions.is_empty() {
        return Ok(());
    }

    // Ctrl-C → graceful shutdown.
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested; waiting for in-flight compiles");

    for session in &mut sessions {
        session.stop().await;
    }
    for session in sessions {
        session.join().await?;
    }
    Ok(())
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "web/Assetforge.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetforge.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print the selected pipelines and their settings.
fn print_dry_run(cfg: &ConfigFile, only: Option<PipelineKind>) {
    println!("assetforge dry-run");
    println!(
        "  config.changes_while_compiling = {:?}",
        cfg.config.changes_while_compiling
    );
    println!("  config.use_hash = {}", cfg.config.use_hash);
    println!();

    for (kind, pipeline) in cfg.pipelines() {
        if only.is_some_and(|only| only != kind) {
            continue;
        }
        println!("[{kind}]");
        println!("  entry: {}", pipeline.entry().display());
        println!("  output: {}", pipeline.output.display());
        if pipeline.compiler.source_map {
            println!("  source_map: true");
        }
        if kind == PipelineKind::Styles {
            println!("  output_style: {:?}", pipeline.compiler.output_style);
            if !pipeline.compiler.load_paths.is_empty() {
                println!("  load_paths: {:?}", pipeline.compiler.load_paths);
            }
        }
        if !pipeline.watch_extra.is_empty() {
            println!("  watch_extra: {:?}", pipeline.watch_extra);
        }
        if !pipeline.exclude.is_empty() {
            println!("  exclude: {:?}", pipeline.exclude);
        }
        if pipeline.notifications {
            println!("  notifications: true");
        }
    }

    debug!("dry-run complete (nothing compiled)");
}
