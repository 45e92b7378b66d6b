// src/script/mod.rs

//! Script pipeline: bundle an entry module and everything it statically
//! requires into one file.

pub mod bundle;
pub mod helpers;
pub mod module;
pub mod resolve;
pub mod transpile;

use std::sync::Arc;

use tracing::{debug, info_span, Instrument};

use crate::config::PipelineConfig;
use crate::errors::CompileError;
use crate::paths::{map_path_for, write_artifacts, Artifact, ProjectPaths};
use crate::pipeline::{CompilationResult, CompileFuture, Pipeline};
use crate::report::Reporter;
use crate::types::PipelineKind;

pub use bundle::{Bundle, GraphOptions, MapTarget, ModuleGraph};
pub use resolve::Extensions;
pub use transpile::{DEFAULT_TARGET, ScriptTarget};

#[derive(Debug, Clone)]
pub struct ScriptPipeline {
    paths: ProjectPaths,
    reporter: Arc<dyn Reporter>,
}

impl ScriptPipeline {
    pub fn new(paths: ProjectPaths, reporter: Arc<dyn Reporter>) -> Self {
        Self { paths, reporter }
    }

    /// Build the bundle and write it. Blocking; `compile` runs this on the
    /// blocking thread pool.
    pub fn build(paths: &ProjectPaths, config: &PipelineConfig) -> Result<CompilationResult, CompileError> {
        if !config.compiler.extra.is_empty() {
            let keys: Vec<_> = config.compiler.extra.keys().collect();
            debug!(?keys, "ignoring unrecognised compiler options");
        }

        let entry = paths.resolve(config.entry());
        let output = paths.resolve(&config.output);
        let map_target = config.compiler.source_map.then(|| MapTarget {
            output: output.clone(),
            map: map_path_for(&output),
        });

        let options = graph_options(config)?;
        debug!(target = options.target.name(), "transpiling");

        let graph = ModuleGraph::build(&entry, &options)?;
        let bundle = bundle::emit(&graph, map_target.as_ref())?;

        let mut artifacts = vec![Artifact::new(&output, bundle.code)];
        if let (Some(target), Some(map)) = (&map_target, bundle.map) {
            artifacts.push(Artifact::new(&target.map, map));
        }
        write_artifacts(&artifacts)?;

        debug!(modules = graph.len(), output = ?output, "bundle written");

        Ok(CompilationResult {
            pipeline: PipelineKind::Scripts,
            path: config.path.clone(),
            file: config.file.clone(),
            output_path: output,
            source_map_path: map_target.map(|t| t.map),
        })
    }
}

/// Transpile target and resolution extensions from `[scripts.compiler]`.
pub fn graph_options(config: &PipelineConfig) -> Result<GraphOptions, CompileError> {
    let name = config.compiler.target.as_deref().unwrap_or(DEFAULT_TARGET);
    let target = ScriptTarget::parse(name)
        .map_err(|e| CompileError::transform(format!("invalid script target {name:?}: {e}")))?;
    Ok(GraphOptions {
        target,
        extensions: Extensions::with_extra(&config.compiler.extensions),
    })
}

impl Pipeline for ScriptPipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Scripts
    }

    fn compile(&self, config: PipelineConfig) -> CompileFuture<'_> {
        let span = info_span!("compile", pipeline = "scripts", entry = ?config.entry());
        Box::pin(
            async move {
                let paths = self.paths.clone();
                let notify = config.notifications;
                let result = tokio::task::spawn_blocking(move || Self::build(&paths, &config))
                    .await
                    .map_err(|e| CompileError::io("script compile task", std::io::Error::other(e)))??;

                self.reporter.compiled(&result.event(notify));
                Ok(result)
            }
            .instrument(span),
        )
    }
}
