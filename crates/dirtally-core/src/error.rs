//! Error types for traversal and aggregation.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur while walking or aggregating a tree.
///
/// Configuration errors (`InvalidPattern`, `UnsupportedTimeOperator`, ...)
/// and root checks are returned before any traversal starts. Per-path I/O
/// failures are attached to the `Entry` or `DirectoryAggregate` they concern.
#[derive(Debug, Clone, Error)]
pub enum WalkError {
    /// Traversal root does not exist.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Aggregation root is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Reading metadata for a path failed.
    #[error("Failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// Listing a directory failed.
    #[error("Failed to list {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// A match or ignore pattern is not a valid regular expression.
    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A time filter names an operator other than before/after/equal.
    #[error("Unsupported time operator: {operator}")]
    UnsupportedTimeOperator { operator: String },

    /// A time filter string could not be parsed.
    #[error("Invalid time filter `{value}`: {message}")]
    InvalidTimeFilter { value: String, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The traversal was cancelled before this path was read.
    #[error("Traversal cancelled")]
    Cancelled,

    /// A background task panicked or was aborted.
    #[error("Traversal task failed: {message}")]
    Task { message: String },
}

impl WalkError {
    /// Create a stat error with path context.
    pub fn stat(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Create a listing error with path context.
    pub fn list(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::List {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Whether the underlying cause is a missing path.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Stat { source, .. } | Self::List { source, .. } => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    /// The path this error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path }
            | Self::NotADirectory { path }
            | Self::Stat { path, .. }
            | Self::List { path, .. } => Some(path),
            _ => None,
        }
    }
}
