// src/style/mod.rs

//! Style pipeline: SCSS to CSS through grass, with data file imports
//! resolved by the [`ImportResolver`].

pub mod imports;
pub mod loader;

use std::path::PathBuf;
use std::sync::Arc;

use grass_compiler::Options;
use tracing::{debug, info_span, Instrument};

use crate::config::PipelineConfig;
use crate::errors::CompileError;
use crate::paths::{map_path_for, relative_between, write_artifacts, Artifact, ProjectPaths};
use crate::pipeline::{CompilationResult, CompileFuture, Pipeline};
use crate::report::Reporter;
use crate::resolver::ImportResolver;
use crate::sourcemap::SourceMapBuilder;
use crate::types::{OutputStyle, PipelineKind};

use imports::ImportRewriter;
use loader::{LoadedSheet, ResolvingFs, TracingLogger};

#[derive(Debug, Clone)]
pub struct StylePipeline {
    paths: ProjectPaths,
    resolver: Arc<ImportResolver>,
    reporter: Arc<dyn Reporter>,
}

impl StylePipeline {
    pub fn new(paths: ProjectPaths, reporter: Arc<dyn Reporter>) -> Self {
        Self::with_resolver(paths, Arc::new(ImportResolver::default()), reporter)
    }

    pub fn with_resolver(
        paths: ProjectPaths,
        resolver: Arc<ImportResolver>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            paths,
            resolver,
            reporter,
        }
    }

    /// Render the stylesheet and write CSS (and map). Blocking.
    pub fn build(
        paths: &ProjectPaths,
        resolver: &ImportResolver,
        config: &PipelineConfig,
    ) -> Result<CompilationResult, CompileError> {
        if !config.compiler.extra.is_empty() {
            let keys: Vec<_> = config.compiler.extra.keys().collect();
            debug!(?keys, "ignoring unrecognised compiler options");
        }

        let entry = paths.resolve(config.entry());
        let output = paths.resolve(&config.output);
        let load_paths: Vec<PathBuf> = config
            .compiler
            .load_paths
            .iter()
            .map(|p| paths.resolve(p))
            .collect();

        let rewriter = ImportRewriter::new()
            .map_err(|e| CompileError::Render {
                message: e.to_string(),
            })?
            .with_load_paths(load_paths.clone());
        let fs = ResolvingFs::new(resolver, rewriter);
        let logger = TracingLogger;
        let options = Options::default()
            .fs(&fs)
            .logger(&logger)
            .style(grass_style(config.compiler.output_style))
            .load_paths(load_paths.as_slice());

        let rendered = grass_compiler::from_path(&entry, &options);
        drop(options);

        let mut css = match rendered {
            Ok(css) => css,
            Err(err) => {
                // A resolver failure is more precise than grass' IO wrapper.
                let message = match fs.take_failure() {
                    Some(failure) => failure.to_string(),
                    None => err.to_string(),
                };
                return Err(CompileError::Render { message });
            }
        };
        let sheets = fs.into_loaded();

        let mut artifacts = Vec::with_capacity(2);
        let source_map_path = if config.compiler.source_map {
            let map_path = map_path_for(&output);
            let map = style_map(&output, &map_path, &sheets, &mut css);
            artifacts.push(Artifact::new(&output, css));
            artifacts.push(Artifact::new(&map_path, map));
            Some(map_path)
        } else {
            artifacts.push(Artifact::new(&output, css));
            None
        };
        write_artifacts(&artifacts)?;

        debug!(sheets = sheets.len(), output = ?output, "stylesheet written");

        Ok(CompilationResult {
            pipeline: PipelineKind::Styles,
            path: config.path.clone(),
            file: config.file.clone(),
            output_path: output,
            source_map_path,
        })
    }
}

fn grass_style(style: OutputStyle) -> grass_compiler::OutputStyle {
    match style {
        OutputStyle::Expanded => grass_compiler::OutputStyle::Expanded,
        OutputStyle::Compressed => grass_compiler::OutputStyle::Compressed,
    }
}

/// Build the map for `css` and append the map reference comment to it.
///
/// grass does not track output positions, so the map lists the sources
/// (with their contents) but carries no mappings.
fn style_map(
    output: &std::path::Path,
    map_path: &std::path::Path,
    sheets: &[LoadedSheet],
    css: &mut String,
) -> String {
    let out_dir = output.parent().map(|p| p.to_path_buf()).unwrap_or_default();
    let file_name = |p: &std::path::Path| {
        p.file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let mut builder = SourceMapBuilder::new(file_name(output));
    for sheet in sheets {
        builder.add_source(relative_between(&out_dir, &sheet.path), sheet.content.clone());
    }

    if !css.is_empty() && !css.ends_with('\n') {
        css.push('\n');
    }
    css.push_str(&format!("/*# sourceMappingURL={} */\n", file_name(map_path)));

    builder.to_json()
}

impl Pipeline for StylePipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Styles
    }

    fn compile(&self, config: PipelineConfig) -> CompileFuture<'_> {
        let span = info_span!("compile", pipeline = "styles", entry = ?config.entry());
        Box::pin(
            async move {
                let paths = self.paths.clone();
                let resolver = Arc::clone(&self.resolver);
                let notify = config.notifications;
                let result =
                    tokio::task::spawn_blocking(move || Self::build(&paths, &resolver, &config))
                        .await
                        .map_err(|e| {
                            CompileError::io("style compile task", std::io::Error::other(e))
                        })??;

                self.reporter.compiled(&result.event(notify));
                Ok(result)
            }
            .instrument(span),
        )
    }
}
