use std::path::PathBuf;
use std::sync::Mutex;

use assetforge::errors::{CompileError, CompileErrorKind};
use assetforge::report::{CompileEvent, Reporter};
use assetforge::types::PipelineKind;

/// One call made on a [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Compiled(CompileEvent),
    Failed {
        pipeline: PipelineKind,
        kind: CompileErrorKind,
        message: String,
        notify: bool,
    },
    Watching {
        pipeline: PipelineKind,
        paths: Vec<PathBuf>,
    },
    WatchStarted {
        development: bool,
    },
}

/// Reporter that keeps every call for later assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub fn compiled(&self) -> Vec<CompileEvent> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Compiled(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<(PipelineKind, CompileErrorKind)> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Failed { pipeline, kind, .. } => Some((pipeline, kind)),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn compiled(&self, event: &CompileEvent) {
        self.reports
            .lock()
            .unwrap()
            .push(Report::Compiled(event.clone()));
    }

    fn failed(&self, pipeline: PipelineKind, error: &CompileError, notify: bool) {
        self.reports.lock().unwrap().push(Report::Failed {
            pipeline,
            kind: error.kind(),
            message: error.to_string(),
            notify,
        });
    }

    fn watching(&self, pipeline: PipelineKind, paths: &[PathBuf]) {
        self.reports.lock().unwrap().push(Report::Watching {
            pipeline,
            paths: paths.to_vec(),
        });
    }

    fn watch_started(&self, development: bool) {
        self.reports
            .lock()
            .unwrap()
            .push(Report::WatchStarted { development });
    }
}
