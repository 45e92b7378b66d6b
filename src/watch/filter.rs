// src/watch/filter.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::trace;

use crate::config::PipelineConfig;
use crate::paths::{self, ProjectPaths};
use crate::watch::hash::ContentCache;

/// Decides which changed paths may trigger a recompile of one pipeline.
///
/// A path is ignored when it is:
/// - the pipeline's own artifact or its source map,
/// - a staging file written next to the artifact while it is being replaced,
/// - matched by one of the `exclude` globs (relative to the project root),
/// - unchanged in content, when hashing is enabled.
pub struct ChangeFilter {
    root: PathBuf,
    artifacts: Vec<PathBuf>,
    exclude_set: Option<GlobSet>,
    cache: Option<ContentCache>,
}

impl fmt::Debug for ChangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFilter")
            .field("root", &self.root)
            .field("artifacts", &self.artifacts)
            .field("use_hash", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl ChangeFilter {
    pub fn new(paths: &ProjectPaths, config: &PipelineConfig, use_hash: bool) -> Result<Self> {
        let output = paths::normalize(&paths.resolve(&config.output));
        let map = paths::map_path_for(&output);

        let exclude_set = if config.exclude.is_empty() {
            None
        } else {
            Some(build_globset(&config.exclude).context("building exclude globset")?)
        };

        Ok(Self {
            root: paths.root().to_path_buf(),
            artifacts: vec![output, map],
            exclude_set,
            cache: use_hash.then(ContentCache::new),
        })
    }

    /// Returns true if a change to `path` should trigger a recompile.
    pub fn accepts(&mut self, path: &Path) -> bool {
        let normalized = paths::normalize(path);

        if self.is_artifact(&normalized) {
            trace!(?path, "ignoring own artifact");
            return false;
        }

        if let Some(exclude) = &self.exclude_set {
            let rel = paths::relative_str(&self.root, &normalized);
            if rel.as_deref().is_some_and(|rel| exclude.is_match(rel)) {
                trace!(?path, "ignoring excluded path");
                return false;
            }
        }

        match &mut self.cache {
            Some(cache) => cache.refresh(&normalized),
            None => true,
        }
    }

    fn is_artifact(&self, path: &Path) -> bool {
        self.artifacts.iter().any(|artifact| {
            if artifact == path || same_file(&self.root, artifact, path) {
                return true;
            }
            // Staged writes land next to the artifact as `.tmpXXXX`.
            artifact.parent() == path.parent()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(".tmp"))
        })
    }
}

fn same_file(root: &Path, a: &Path, b: &Path) -> bool {
    match (paths::relative_str(root, a), paths::relative_str(root, b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
