// src/orchestrator.rs

//! Composition root: binds the configured pipelines to the project root and
//! runs them once or under watch sessions.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::errors::{AssetforgeError, CompileError, Result};
use crate::paths::ProjectPaths;
use crate::pipeline::{CompilationResult, Pipeline};
use crate::report::Reporter;
use crate::script::ScriptPipeline;
use crate::style::StylePipeline;
use crate::types::PipelineKind;
use crate::watch::{self, SessionHandle};

/// How [`Orchestrator::start`] runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    /// Keep watching after the initial compile.
    pub watch: bool,
    /// Restrict to one pipeline.
    pub only: Option<PipelineKind>,
    /// Only changes the watch-started banner.
    pub development: bool,
}

#[derive(Debug)]
pub struct Orchestrator {
    paths: ProjectPaths,
    config: ConfigFile,
    reporter: Arc<dyn Reporter>,
    scripts: Arc<ScriptPipeline>,
    styles: Arc<StylePipeline>,
}

impl Orchestrator {
    pub fn new(paths: ProjectPaths, config: ConfigFile, reporter: Arc<dyn Reporter>) -> Self {
        let scripts = Arc::new(ScriptPipeline::new(paths.clone(), Arc::clone(&reporter)));
        let styles = Arc::new(StylePipeline::new(paths.clone(), Arc::clone(&reporter)));
        Self {
            paths,
            config,
            reporter,
            scripts,
            styles,
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Compile the `[scripts]` pipeline once. `None` if it is not configured.
    pub async fn compile_scripts(&self) -> Option<std::result::Result<CompilationResult, CompileError>> {
        let config = self.config.scripts.clone()?;
        Some(self.scripts.compile(config).await)
    }

    /// Compile the `[styles]` pipeline once. `None` if it is not configured.
    pub async fn compile_styles(&self) -> Option<std::result::Result<CompilationResult, CompileError>> {
        let config = self.config.styles.clone()?;
        Some(self.styles.compile(config).await)
    }

    /// Start a watch session for the `[scripts]` pipeline.
    pub fn watch_scripts(&self) -> Result<Option<SessionHandle>> {
        self.watch(PipelineKind::Scripts)
    }

    /// Start a watch session for the `[styles]` pipeline.
    pub fn watch_styles(&self) -> Result<Option<SessionHandle>> {
        self.watch(PipelineKind::Styles)
    }

    /// Compile every selected pipeline once, then optionally watch them.
    ///
    /// Without `watch`, any failed compile makes this return
    /// [`AssetforgeError::PipelinesFailed`] after all pipelines ran. With
    /// `watch`, failures are only reported and the sessions start anyway.
    pub async fn start(&self, options: StartOptions) -> Result<Vec<SessionHandle>> {
        let selected: Vec<PipelineKind> = self
            .config
            .pipelines()
            .map(|(kind, _)| kind)
            .filter(|kind| options.only.is_none_or(|only| only == *kind))
            .collect();

        if selected.is_empty() {
            return Err(AssetforgeError::ConfigError(
                "no configured pipeline matches the selection".to_string(),
            ));
        }

        let mut failures = 0usize;
        for kind in &selected {
            let outcome = match kind {
                PipelineKind::Scripts => self.compile_scripts().await,
                PipelineKind::Styles => self.compile_styles().await,
            };
            if let Some(Err(err)) = outcome {
                let notify = self.config.pipeline(*kind).is_some_and(|p| p.notifications);
                self.reporter.failed(*kind, &err, notify);
                failures += 1;
            }
        }

        if !options.watch {
            return match failures {
                0 => Ok(Vec::new()),
                n => Err(AssetforgeError::PipelinesFailed(n)),
            };
        }
        if failures > 0 {
            warn!(failures, "initial compile failed; watching anyway");
        }

        let mut sessions = Vec::with_capacity(selected.len());
        for kind in selected {
            if let Some(handle) = self.watch(kind)? {
                sessions.push(handle);
            }
        }
        info!(sessions = sessions.len(), "watching");
        self.reporter.watch_started(options.development);
        Ok(sessions)
    }

    fn watch(&self, kind: PipelineKind) -> Result<Option<SessionHandle>> {
        let Some(config) = self.config.pipeline(kind).cloned() else {
            return Ok(None);
        };
        let pipeline: Arc<dyn Pipeline> = match kind {
            PipelineKind::Scripts => self.scripts.clone(),
            PipelineKind::Styles => self.styles.clone(),
        };
        let handle = watch::watch_pipeline(
            pipeline,
            &self.paths,
            config,
            &self.config.config,
            Arc::clone(&self.reporter),
        )?;
        Ok(Some(handle))
    }
}
