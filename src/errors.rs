// src/errors.rs

//! Crate-wide error types.
//!
//! Two layers:
//! - [`CompileError`] is what a pipeline `compile` surfaces. Watch sessions
//!   report it and keep going; one-shot builds turn it into a non-zero exit.
//! - [`AssetforgeError`] covers everything around the pipelines: config
//!   loading, watcher setup, IO in the composition root.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    Syntax,
    Resolution,
    Transform,
    Render,
    Io,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompileErrorKind::Syntax => "syntax",
            CompileErrorKind::Resolution => "resolution",
            CompileErrorKind::Transform => "transform",
            CompileErrorKind::Render => "render",
            CompileErrorKind::Io => "io",
        };
        f.write_str(s)
    }
}

/// Failure of a single pipeline compile.
///
/// A compile that returns this error has not touched its output artifacts.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Malformed script source. `frame` shows the offending line when the
    /// parser could point at one.
    #[error("syntax error: {message}")]
    Syntax {
        message: String,
        frame: Option<String>,
    },

    /// A module request that could not be mapped to a file.
    #[error("unresolved module: {message}")]
    Resolution { message: String },

    /// The script transpiler rejected a module, or its output needs a
    /// runtime helper the bundle cannot provide.
    #[error("transform error: {message}")]
    Transform { message: String },

    /// Any failure inside the style compiler, including data file imports
    /// that could not be loaded or translated.
    #[error("render error: {message}")]
    Render { message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn kind(&self) -> CompileErrorKind {
        match self {
            CompileError::Syntax { .. } => CompileErrorKind::Syntax,
            CompileError::Resolution { .. } => CompileErrorKind::Resolution,
            CompileError::Transform { .. } => CompileErrorKind::Transform,
            CompileError::Render { .. } => CompileErrorKind::Render,
            CompileError::Io { .. } => CompileErrorKind::Io,
        }
    }

    /// Source-context frame, only ever present for script syntax errors.
    pub fn source_frame(&self) -> Option<&str> {
        match self {
            CompileError::Syntax { frame, .. } => frame.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CompileError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn transform(message: impl Into<String>) -> Self {
        CompileError::Transform {
            message: message.into(),
        }
    }

    pub(crate) fn resolution(message: impl Into<String>) -> Self {
        CompileError::Resolution {
            message: message.into(),
        }
    }
}

/// Errors raised by the style import resolver.
///
/// These never escape a style compile directly; the style pipeline folds them
/// into [`CompileError::Render`].
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("failed to read data file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse data file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("data file {path:?} cannot be expressed as SCSS variables: {message}")]
    Shape { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum AssetforgeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Compile failed: {0}")]
    Compile(#[from] CompileError),

    #[error("{0} pipeline(s) failed to compile")]
    PipelinesFailed(usize),

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AssetforgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_frame_follow_variant() {
        let err = CompileError::Syntax {
            message: "Unexpected token".to_string(),
            frame: Some("a.js:1:1".to_string()),
        };
        assert_eq!(err.kind(), CompileErrorKind::Syntax);
        assert_eq!(err.source_frame(), Some("a.js:1:1"));

        let err = CompileError::Render {
            message: "boom".to_string(),
        };
        assert_eq!(err.kind(), CompileErrorKind::Render);
        assert!(err.source_frame().is_none());
        assert_eq!(err.to_string(), "render error: boom");
    }
}
