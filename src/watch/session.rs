// src/watch/session.rs

//! Pure watch session state machine.
//!
//! [`SessionCore`] consumes [`SessionEvent`]s and answers with a
//! [`SessionStep`]: the commands the async shell should carry out and whether
//! the session keeps running. It owns no channels, tasks or files, so every
//! transition can be unit tested synchronously.
//!
//! States:
//! - `Idle`: a change starts a compile.
//! - `Compiling`: changes are queued (collapsed into one follow-up compile)
//!   or dropped, depending on [`ChangeWhileCompiling`]. A second compile is
//!   never started while one is in flight.
//!
//! A stop request while compiling lets the compile finish first.

use std::path::PathBuf;

use crate::errors::CompileErrorKind;
use crate::types::ChangeWhileCompiling;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Compiling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileOutcome {
    Success,
    Failed(CompileErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Something under a watched path changed.
    Changed { paths: Vec<PathBuf> },
    /// The in-flight compile completed.
    CompileFinished { outcome: CompileOutcome },
    /// Shut the session down once no compile is running.
    StopRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    StartCompile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStep {
    pub commands: Vec<SessionCommand>,
    pub keep_running: bool,
}

impl SessionStep {
    fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    fn compile() -> Self {
        Self {
            commands: vec![SessionCommand::StartCompile],
            keep_running: true,
        }
    }

    fn exit() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionCore {
    state: SessionState,
    pending: bool,
    stopping: bool,
    policy: ChangeWhileCompiling,
    compiles_started: u64,
    last_outcome: Option<CompileOutcome>,
}

impl SessionCore {
    pub fn new(policy: ChangeWhileCompiling) -> Self {
        Self {
            state: SessionState::Idle,
            pending: false,
            stopping: false,
            policy,
            compiles_started: 0,
            last_outcome: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    pub fn compiles_started(&self) -> u64 {
        self.compiles_started
    }

    pub fn last_outcome(&self) -> Option<CompileOutcome> {
        self.last_outcome
    }

    pub fn step(&mut self, event: SessionEvent) -> SessionStep {
        match event {
            SessionEvent::Changed { .. } => self.on_change(),
            SessionEvent::CompileFinished { outcome } => self.on_finished(outcome),
            SessionEvent::StopRequested => self.on_stop(),
        }
    }

    fn on_change(&mut self) -> SessionStep {
        if self.stopping {
            return SessionStep::idle();
        }
        match self.state {
            SessionState::Idle => self.start(),
            SessionState::Compiling => {
                if self.policy == ChangeWhileCompiling::Queue {
                    self.pending = true;
                }
                SessionStep::idle()
            }
        }
    }

    fn on_finished(&mut self, outcome: CompileOutcome) -> SessionStep {
        if self.state != SessionState::Compiling {
            // Stray completion; nothing was in flight.
            return SessionStep::idle();
        }
        self.state = SessionState::Idle;
        self.last_outcome = Some(outcome);

        if self.stopping {
            return SessionStep::exit();
        }
        if std::mem::take(&mut self.pending) {
            return self.start();
        }
        SessionStep::idle()
    }

    fn on_stop(&mut self) -> SessionStep {
        self.pending = false;
        match self.state {
            SessionState::Idle => SessionStep::exit(),
            SessionState::Compiling => {
                self.stopping = true;
                SessionStep::idle()
            }
        }
    }

    fn start(&mut self) -> SessionStep {
        self.state = SessionState::Compiling;
        self.compiles_started += 1;
        SessionStep::compile()
    }
}
