//! Error types for mdcc.
//!
//! Library crates use [`MdccError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all mdcc operations.
#[derive(Debug, thiserror::Error)]
pub enum MdccError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A user-supplied regular expression failed to compile.
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File content is not valid UTF-8.
    #[error("{path:?} is not valid UTF-8 text")]
    Decode { path: PathBuf },

    /// Glob parsing or directory walking error.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// External instruction command failed.
    #[error("instruction error: {0}")]
    Instruction(String),

    /// Output path template could not be resolved.
    #[error("template error: {message}")]
    Template { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MdccError>;

impl MdccError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a template error from any displayable message.
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
