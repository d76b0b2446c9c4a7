//! Error types for enrolsync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::CourseId;

/// Errors from loading the sync configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load, with file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.enrolsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Failures reported by a [`crate::DirectoryStore`] implementation.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The backing store rejected or failed an operation.
    #[error("directory backend error: {0}")]
    Backend(String),

    /// An operation referenced a course the store does not know.
    #[error("course {0} does not exist")]
    MissingCourse(CourseId),
}

/// Errors from reading or writing a directory snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse directory snapshot at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("directory snapshot not found at {path}")]
    NotFound { path: PathBuf },
}
