//! Error types for enrolsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use enrolsync_core::{CourseId, DirectoryError};

/// Failures that stop a sync run, or an audit write.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the directory store.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// The audit log could not be appended to.
    #[error("I/O error at {path}: {source}")]
    AuditLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::AuditLog`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::AuditLog {
        path: path.into(),
        source,
    }
}

/// Recoverable problems recorded in the outcome; the run carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncIssue {
    /// A claimed role has no directory counterpart.
    #[error("role not found: {role}")]
    RoleNotFound { role: String },

    /// No channel could be found or created for a claimed course.
    #[error("could not create instance for role {role}, course {course}")]
    InstanceCreationFailed { role: String, course: CourseId },
}
