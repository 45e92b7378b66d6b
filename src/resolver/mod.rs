// src/resolver/mod.rs

//! Import resolution for the style pipeline.
//!
//! Every `@import` url the style compiler would load goes through an
//! [`ImportResolver`], which asks its strategies in order and uses the first
//! one that accepts the url:
//!
//! - [`DataFileStrategy`] turns a YAML data file into inline SCSS variable
//!   declarations.
//! - [`PassThroughStrategy`] leaves the url alone so the compiler loads the
//!   file itself.

pub mod data_file;

use std::fmt::Debug;
use std::path::PathBuf;

use tracing::trace;

use crate::errors::ResolveError;

pub use data_file::{DataFileStrategy, yaml_to_scss};

/// One import statement argument, seen from the stylesheet containing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReference {
    /// The url as written in the `@import` statement.
    pub url: String,
    /// Path of the stylesheet that contains the statement.
    pub previous_url: PathBuf,
    /// Directories searched when the url is not next to the stylesheet.
    pub load_paths: Vec<PathBuf>,
}

impl ImportReference {
    pub fn new(url: impl Into<String>, previous_url: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            previous_url: previous_url.into(),
            load_paths: Vec::new(),
        }
    }

    pub fn with_load_paths(mut self, load_paths: &[PathBuf]) -> Self {
        self.load_paths = load_paths.to_vec();
        self
    }

    /// `url` resolved against the directory of the importing stylesheet,
    /// then against each load path in order.
    ///
    /// When no candidate exists the stylesheet-relative path is returned, so
    /// errors name the place the import was looked for first.
    pub fn resolved_path(&self) -> PathBuf {
        let base = self
            .previous_url
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        let relative = base.join(&self.url);
        if relative.is_file() {
            return relative;
        }
        self.load_paths
            .iter()
            .map(|dir| dir.join(&self.url))
            .find(|candidate| candidate.is_file())
            .unwrap_or(relative)
    }
}

/// Outcome of resolving an [`ImportReference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImport {
    /// Let the compiler load this url the usual way.
    FilePath(String),
    /// Substitute this SCSS text for the import.
    InlineContent(String),
}

/// A single way of resolving imports.
pub trait ImportStrategy: Send + Sync + Debug {
    fn can_resolve(&self, url: &str) -> bool;
    fn resolve(&self, import: &ImportReference) -> Result<ResolvedImport, ResolveError>;
}

/// Accepts every url and returns it unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughStrategy;

impl ImportStrategy for PassThroughStrategy {
    fn can_resolve(&self, _url: &str) -> bool {
        true
    }

    fn resolve(&self, import: &ImportReference) -> Result<ResolvedImport, ResolveError> {
        Ok(ResolvedImport::FilePath(import.url.clone()))
    }
}

/// Ordered list of strategies; the first that accepts a url wins.
#[derive(Debug)]
pub struct ImportResolver {
    strategies: Vec<Box<dyn ImportStrategy>>,
}

impl ImportResolver {
    pub fn new(strategies: Vec<Box<dyn ImportStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, import: &ImportReference) -> Result<ResolvedImport, ResolveError> {
        for strategy in &self.strategies {
            if strategy.can_resolve(&import.url) {
                trace!(url = %import.url, ?strategy, "import strategy selected");
                return strategy.resolve(import);
            }
        }
        Ok(ResolvedImport::FilePath(import.url.clone()))
    }
}

impl Default for ImportResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(DataFileStrategy::default()),
            Box::new(PassThroughStrategy),
        ])
    }
}
