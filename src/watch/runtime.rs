// src/watch/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, Instrument};

use crate::config::PipelineConfig;
use crate::errors::{AssetforgeError, Result};
use crate::pipeline::Pipeline;
use crate::report::Reporter;
use crate::types::{ChangeWhileCompiling, PipelineKind};

use super::session::{CompileOutcome, SessionCommand, SessionCore, SessionEvent, SessionState};
use super::watcher::WatcherHandle;

/// Snapshot of a session, published after every processed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub compiles_started: u64,
    pub compiles_finished: u64,
    pub last_outcome: Option<CompileOutcome>,
}

impl SessionStatus {
    fn initial() -> Self {
        Self {
            state: SessionState::Idle,
            compiles_started: 0,
            compiles_finished: 0,
            last_outcome: None,
        }
    }
}

/// Async shell around [`SessionCore`]: receives events, runs compiles on
/// spawned tasks and feeds their completion back into the core.
///
/// Compiles run off the event loop so changes keep arriving (and coalescing)
/// while one is in flight.
pub struct WatchSession {
    kind: PipelineKind,
    core: SessionCore,
    event_rx: mpsc::Receiver<SessionEvent>,
    event_tx: mpsc::Sender<SessionEvent>,
    pipeline: Arc<dyn Pipeline>,
    config: PipelineConfig,
    reporter: Arc<dyn Reporter>,
    status_tx: watch::Sender<SessionStatus>,
    compiles_finished: u64,
}

impl fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSession")
            .field("kind", &self.kind)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl WatchSession {
    /// Start a session for `pipeline` on the current tokio runtime.
    ///
    /// The session starts `Idle`; nothing is compiled until the first change
    /// arrives through [`SessionHandle::notify_change`] or an attached
    /// filesystem watcher.
    pub fn spawn(
        pipeline: Arc<dyn Pipeline>,
        config: PipelineConfig,
        policy: ChangeWhileCompiling,
        reporter: Arc<dyn Reporter>,
    ) -> SessionHandle {
        let kind = pipeline.kind();
        let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(64);
        let (status_tx, status_rx) = watch::channel(SessionStatus::initial());

        let session = Self {
            kind,
            core: SessionCore::new(policy),
            event_rx,
            event_tx: event_tx.clone(),
            pipeline,
            config,
            reporter,
            status_tx,
            compiles_finished: 0,
        };

        let span = info_span!("watch", pipeline = %kind);
        let task = tokio::spawn(session.run().instrument(span));

        SessionHandle {
            kind,
            tx: event_tx,
            status: status_rx,
            task: Some(task),
            watcher: None,
        }
    }

    async fn run(mut self) -> Result<()> {
        info!(entry = ?self.config.entry(), "watch session started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "session received event");

            if matches!(event, SessionEvent::CompileFinished { .. }) {
                self.compiles_finished += 1;
            }

            let step = self.core.step(event);
            for command in step.commands {
                match command {
                    SessionCommand::StartCompile => self.start_compile(),
                }
            }
            self.publish();

            if !step.keep_running {
                break;
            }
        }

        info!("watch session stopped");
        Ok(())
    }

    fn start_compile(&self) {
        let kind = self.kind;
        let pipeline = Arc::clone(&self.pipeline);
        let reporter = Arc::clone(&self.reporter);
        let config = self.config.clone();
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            let notify = config.notifications;
            let outcome = match pipeline.compile(config).await {
                Ok(_) => CompileOutcome::Success,
                Err(err) => {
                    reporter.failed(kind, &err, notify);
                    CompileOutcome::Failed(err.kind())
                }
            };
            if tx
                .send(SessionEvent::CompileFinished { outcome })
                .await
                .is_err()
            {
                debug!("session gone before compile finished");
            }
        });
    }

    fn publish(&self) {
        let status = SessionStatus {
            state: self.core.state(),
            compiles_started: self.core.compiles_started(),
            compiles_finished: self.compiles_finished,
            last_outcome: self.core.last_outcome(),
        };
        self.status_tx.send_replace(status);
    }
}

/// Owner-side handle of a running [`WatchSession`].
///
/// Holds the filesystem watcher (if one was attached), so dropping the handle
/// stops filesystem notifications. The session task itself keeps running
/// until [`stop`](Self::stop) is called.
pub struct SessionHandle {
    kind: PipelineKind,
    tx: mpsc::Sender<SessionEvent>,
    status: watch::Receiver<SessionStatus>,
    task: Option<JoinHandle<Result<()>>>,
    watcher: Option<WatcherHandle>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("kind", &self.kind)
            .field("status", &*self.status.borrow())
            .field("watching", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    /// Latest published status.
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Wait until the published status satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&SessionStatus) -> bool,
    ) -> Result<SessionStatus> {
        let mut rx = self.status.clone();
        let status = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| self.gone())?;
        Ok(*status)
    }

    /// Report a change under a watched path.
    pub async fn notify_change(&self, paths: Vec<PathBuf>) -> Result<()> {
        self.tx
            .send(SessionEvent::Changed { paths })
            .await
            .map_err(|_| self.gone())
    }

    /// Ask the session to stop. Filesystem notifications end immediately; a
    /// compile in flight runs to completion first. Use [`join`](Self::join)
    /// to wait for that.
    pub async fn stop(&mut self) {
        self.watcher = None;
        if self.tx.send(SessionEvent::StopRequested).await.is_err() {
            debug!(pipeline = %self.kind, "stop requested on finished session");
        }
    }

    /// Wait for the session task to finish.
    pub async fn join(mut self) -> Result<()> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| AssetforgeError::Other(anyhow::Error::new(e)))?,
            None => Ok(()),
        }
    }

    pub(crate) fn sender(&self) -> mpsc::Sender<SessionEvent> {
        self.tx.clone()
    }

    pub(crate) fn attach_watcher(&mut self, watcher: WatcherHandle) {
        self.watcher = Some(watcher);
    }

    fn gone(&self) -> AssetforgeError {
        AssetforgeError::Other(anyhow!("{} watch session has stopped", self.kind))
    }
}
