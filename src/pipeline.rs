// src/pipeline.rs

//! The seam between watch sessions and the two compilers.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::config::PipelineConfig;
use crate::errors::CompileError;
use crate::report::CompileEvent;
use crate::types::PipelineKind;

/// Outcome of a successful compile.
///
/// Carries the source location alongside the artifacts so callers can report
/// what was built without holding on to the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationResult {
    pub pipeline: PipelineKind,
    /// Source directory, as configured.
    pub path: PathBuf,
    /// Entry file inside `path`, as configured.
    pub file: String,
    /// Absolute path of the written artifact.
    pub output_path: PathBuf,
    /// Absolute path of the written source map, if one was requested.
    pub source_map_path: Option<PathBuf>,
}

impl CompilationResult {
    pub(crate) fn event(&self, notify: bool) -> CompileEvent {
        CompileEvent {
            pipeline: self.pipeline,
            path: self.path.clone(),
            file: self.file.clone(),
            output: self.output_path.clone(),
            source_map: self.source_map_path.clone(),
            notify,
        }
    }
}

pub type CompileFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CompilationResult, CompileError>> + Send + 'a>>;

/// Something that turns a [`PipelineConfig`] into artifacts on disk.
///
/// `compile` must either write every artifact or none. Implementations emit
/// their success event themselves and return failures without reporting
/// them; the caller decides how failures are surfaced.
pub trait Pipeline: Send + Sync {
    fn kind(&self) -> PipelineKind;

    fn compile(&self, config: PipelineConfig) -> CompileFuture<'_>;
}
