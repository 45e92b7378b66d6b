// src/watch/mod.rs

//! Watch sessions: recompiling a pipeline whenever its sources change.
//!
//! This module is responsible for:
//! - The pure session state machine (`session`) that enforces at most one
//!   compile in flight and coalesces changes arriving meanwhile.
//! - The async shell (`runtime`) that runs compiles and exposes a handle.
//! - Wiring up a cross-platform filesystem watcher (`notify`) and filtering
//!   its events (`filter`, `hash`).

pub mod filter;
pub mod hash;
pub mod runtime;
pub mod session;
pub mod watcher;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{GlobalSection, PipelineConfig};
use crate::errors::Result;
use crate::paths::ProjectPaths;
use crate::pipeline::Pipeline;
use crate::report::Reporter;

pub use filter::ChangeFilter;
pub use runtime::{SessionHandle, SessionStatus, WatchSession};
pub use session::{CompileOutcome, SessionCore, SessionEvent, SessionState, SessionStep};
pub use watcher::{spawn_watcher, WatcherHandle};

/// Paths a pipeline's session watches: its source directory plus
/// `watch_extra`, resolved against the project root.
pub fn watch_targets(paths: &ProjectPaths, config: &PipelineConfig) -> Vec<PathBuf> {
    let mut targets = vec![paths.resolve(&config.path)];
    for extra in &config.watch_extra {
        let extra = paths.resolve(extra);
        if !targets.contains(&extra) {
            targets.push(extra);
        }
    }
    targets
}

/// Start a watch session for `pipeline` bound to the filesystem.
pub fn watch_pipeline(
    pipeline: Arc<dyn Pipeline>,
    paths: &ProjectPaths,
    config: PipelineConfig,
    global: &GlobalSection,
    reporter: Arc<dyn Reporter>,
) -> Result<SessionHandle> {
    let kind = pipeline.kind();
    let filter = ChangeFilter::new(paths, &config, global.use_hash)?;
    let targets = watch_targets(paths, &config);

    let mut handle = WatchSession::spawn(
        pipeline,
        config,
        global.changes_while_compiling,
        Arc::clone(&reporter),
    );
    let (watcher, watched) = spawn_watcher(targets, filter, handle.sender())?;
    handle.attach_watcher(watcher);

    reporter.watching(kind, &watched);
    Ok(handle)
}
