// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::watch::filter::ChangeFilter;
use crate::watch::session::SessionEvent;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher over `targets` that sends
/// `SessionEvent::Changed` into a session for every notify event with at least
/// one path accepted by `filter`.
///
/// Directories are watched recursively, files on their own. Targets that do
/// not exist (yet) are skipped with a warning rather than failing the session.
/// Returns the watcher handle and the targets actually watched.
pub fn spawn_watcher(
    targets: Vec<PathBuf>,
    mut filter: ChangeFilter,
    session_tx: mpsc::Sender<SessionEvent>,
) -> Result<(WatcherHandle, Vec<PathBuf>)> {
    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // No tracing subscriber guarantees on notify's thread.
                    eprintln!("assetforge: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetforge: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    let mut watched = Vec::with_capacity(targets.len());
    for target in targets {
        let mode = if target.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        match watcher.watch(&target, mode) {
            Ok(()) => watched.push(target),
            Err(err) => warn!(path = ?target, "cannot watch path: {err}"),
        }
    }

    info!(paths = ?watched, "file watcher started");

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!(?event, "received notify event");

            let paths: Vec<PathBuf> = event
                .paths
                .into_iter()
                .filter(|p| filter.accepts(p))
                .collect();
            if paths.is_empty() {
                continue;
            }

            if session_tx.send(SessionEvent::Changed { paths }).await.is_err() {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok((WatcherHandle { _inner: watcher }, watched))
}
