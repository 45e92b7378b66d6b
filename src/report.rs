// src/report.rs

//! Reporting compile outcomes.
//!
//! Pipelines and watch sessions never log outcomes on their own; they hand
//! them to the [`Reporter`] they were constructed with. The binary uses
//! [`TracingReporter`]; tests use a recording one.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::errors::CompileError;
use crate::types::PipelineKind;

/// Informational event emitted once per successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileEvent {
    pub pipeline: PipelineKind,
    pub path: PathBuf,
    pub file: String,
    pub output: PathBuf,
    pub source_map: Option<PathBuf>,
    /// The pipeline asked for a user-facing notification.
    pub notify: bool,
}

pub trait Reporter: Send + Sync + Debug {
    fn compiled(&self, event: &CompileEvent);

    /// `notify` carries the pipeline's `notifications` flag.
    fn failed(&self, pipeline: PipelineKind, error: &CompileError, notify: bool);

    fn watching(&self, _pipeline: PipelineKind, _paths: &[PathBuf]) {}

    /// Called once after every selected pipeline has a running watch session.
    fn watch_started(&self, _development: bool) {}
}

/// Reports through `tracing`; notifications go to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn compiled(&self, event: &CompileEvent) {
        info!(
            pipeline = %event.pipeline,
            entry = ?event.path.join(&event.file),
            output = ?event.output,
            source_map = ?event.source_map,
            "compiled"
        );
        if event.notify {
            println!(
                "assetforge: {} compiled -> {}",
                event.pipeline,
                display(&event.output)
            );
        }
    }

    fn failed(&self, pipeline: PipelineKind, err: &CompileError, notify: bool) {
        error!(pipeline = %pipeline, kind = %err.kind(), "{err}");
        if let Some(frame) = err.source_frame() {
            error!(pipeline = %pipeline, "\n{frame}");
        }
        if notify {
            println!("{}", failure_notice(pipeline));
        }
    }

    fn watching(&self, pipeline: PipelineKind, paths: &[PathBuf]) {
        info!(pipeline = %pipeline, ?paths, "watching for changes");
    }

    fn watch_started(&self, development: bool) {
        info!(development, "watchers started");
        println!("{}", welcome_banner(development));
    }
}

/// One-line notice printed for a failed compile when notifications are on.
pub fn failure_notice(pipeline: PipelineKind) -> String {
    format!("assetforge: {pipeline}: an error occurred, see the log for details")
}

/// Framed message printed once watching has begun.
pub fn welcome_banner(development: bool) -> String {
    let message = if development {
        "Running development mode and watchers started - happy coding!"
    } else {
        "watchers started - happy coding!"
    };
    let rule = format!("+{}+", "-".repeat(message.len() + 2));
    format!("{rule}\n| {message} |\n{rule}")
}

fn display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
