// src/style/loader.rs

//! Glue between grass and the rest of the crate: a filesystem that rewrites
//! imports on the way in, and a logger that forwards to `tracing`.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};

use grass_compiler::codemap::SpanLoc;
use grass_compiler::{Fs, Logger};
use tracing::{debug, warn};

use crate::errors::ResolveError;
use crate::logging::SASS_TARGET;
use crate::paths;
use crate::resolver::ImportResolver;
use crate::style::imports::ImportRewriter;

/// A stylesheet read during one compile, with its text as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSheet {
    pub path: PathBuf,
    pub content: String,
}

/// [`Fs`] that serves SCSS files with their data file imports inlined.
///
/// One instance per compile. It records every stylesheet it served (for the
/// source map) and keeps the first resolver failure, because grass only sees
/// an opaque IO error.
#[derive(Debug)]
pub struct ResolvingFs<'r> {
    resolver: &'r ImportResolver,
    rewriter: ImportRewriter,
    loaded: RefCell<Vec<LoadedSheet>>,
    failure: RefCell<Option<ResolveError>>,
}

impl<'r> ResolvingFs<'r> {
    pub fn new(resolver: &'r ImportResolver, rewriter: ImportRewriter) -> Self {
        Self {
            resolver,
            rewriter,
            loaded: RefCell::new(Vec::new()),
            failure: RefCell::new(None),
        }
    }

    pub fn take_failure(&self) -> Option<ResolveError> {
        self.failure.borrow_mut().take()
    }

    pub fn into_loaded(self) -> Vec<LoadedSheet> {
        self.loaded.into_inner()
    }

    fn record(&self, path: &Path, content: &str) {
        let mut loaded = self.loaded.borrow_mut();
        if !loaded.iter().any(|s| s.path == path) {
            loaded.push(LoadedSheet {
                path: path.to_path_buf(),
                content: content.to_string(),
            });
        }
    }
}

impl Fs for ResolvingFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let bytes = std::fs::read(path)?;

        let is_scss = paths::extension(path).as_deref() == Some("scss");
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => return Ok(e.into_bytes()),
        };
        self.record(path, &text);

        if !is_scss {
            return Ok(text.into_bytes());
        }

        match self.rewriter.rewrite(&text, path, self.resolver) {
            Ok(Some(rewritten)) => {
                debug!(path = ?path, "data file imports inlined");
                Ok(rewritten.into_bytes())
            }
            Ok(None) => Ok(text.into_bytes()),
            Err(err) => {
                let message = err.to_string();
                let mut failure = self.failure.borrow_mut();
                if failure.is_none() {
                    *failure = Some(err);
                }
                Err(io::Error::other(message))
            }
        }
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

/// Routes `@debug` and `@warn` output to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, location: SpanLoc, message: &str) {
        debug!(
            target: SASS_TARGET,
            file = location.file.name(),
            line = location.begin.line + 1,
            "{message}"
        );
    }

    fn warn(&self, location: SpanLoc, message: &str) {
        warn!(
            target: SASS_TARGET,
            file = location.file.name(),
            line = location.begin.line + 1,
            column = location.begin.column + 1,
            "{message}"
        );
    }
}
