//! Append-only audit log of enrolment changes.
//!
//! One line per event:
//!
//! ```text
//! Mon Jan 06 09:14:02  2025 [client 10.0.0.7] [info] alice enrolled in course CS101 with role student
//! ```
//!
//! Lines end in `\r\n`. The file is opened in append mode on every write and
//! never truncated. A log with no destination is silently disabled.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

use crate::error::{io_err, SyncError};

const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S  %Y";

/// Severity written into the audit line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Error,
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditLevel::Info => write!(f, "info"),
            AuditLevel::Error => write!(f, "error"),
        }
    }
}

/// Audit log sink for one sync run.
#[derive(Debug, Clone)]
pub struct AuditLog {
    destination: Option<PathBuf>,
    remote_addr: String,
}

impl AuditLog {
    /// Resolve `logfile` against `data_root`. Paths starting with `/` are used as is.
    pub fn new(logfile: Option<&str>, data_root: &Path, remote_addr: impl Into<String>) -> Self {
        Self {
            destination: resolve_destination(logfile, data_root),
            remote_addr: remote_addr.into(),
        }
    }

    /// A log that writes nothing.
    pub fn disabled() -> Self {
        Self {
            destination: None,
            remote_addr: String::new(),
        }
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn info(&self, message: &str) -> Result<(), SyncError> {
        self.write(message, AuditLevel::Info)
    }

    pub fn error(&self, message: &str) -> Result<(), SyncError> {
        self.write(message, AuditLevel::Error)
    }

    /// Best-effort write, mirrored to the process log. A failed append
    /// becomes a one-line warning and never reaches the caller.
    pub fn record(&self, level: AuditLevel, message: &str) {
        match level {
            AuditLevel::Info => tracing::info!("{message}"),
            AuditLevel::Error => tracing::error!("{message}"),
        }
        if let Err(err) = self.write(message, level) {
            tracing::warn!("audit log write failed: {err}");
        }
    }

    /// Append one decorated line. No-op without a destination.
    pub fn write(&self, message: &str, level: AuditLevel) -> Result<(), SyncError> {
        let Some(path) = &self.destination else {
            return Ok(());
        };
        let line = format_line(&Local::now(), &self.remote_addr, level, message);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| io_err(path, e))?;
        file.write_all(line.as_bytes()).map_err(|e| io_err(path, e))?;
        Ok(())
    }
}

fn resolve_destination(logfile: Option<&str>, data_root: &Path) -> Option<PathBuf> {
    let logfile = logfile.filter(|l| !l.is_empty())?;
    if logfile.starts_with('/') {
        Some(PathBuf::from(logfile))
    } else {
        Some(data_root.join(logfile))
    }
}

/// `<timestamp> [client <addr>] [<level>] <message>\r\n`
pub fn format_line<Tz>(at: &DateTime<Tz>, remote_addr: &str, level: AuditLevel, message: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "{} [client {remote_addr}] [{level}] {message}\r\n",
        at.format(TIMESTAMP_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn line_format_matches_host_log() {
        let at = Utc.with_ymd_and_hms(2025, 1, 6, 9, 14, 2).unwrap();
        let line = format_line(&at, "10.0.0.7", AuditLevel::Info, "alice enrolled");
        assert_eq!(
            line,
            "Mon Jan 06 09:14:02  2025 [client 10.0.0.7] [info] alice enrolled\r\n"
        );
    }

    #[test]
    fn relative_destination_is_under_data_root() {
        let log = AuditLog::new(Some("saml/enrol.log"), Path::new("/var/data"), "-");
        assert_eq!(log.destination(), Some(Path::new("/var/data/saml/enrol.log")));
    }

    #[test]
    fn absolute_destination_is_kept() {
        let log = AuditLog::new(Some("/tmp/enrol.log"), Path::new("/var/data"), "-");
        assert_eq!(log.destination(), Some(Path::new("/tmp/enrol.log")));
    }

    #[test]
    fn empty_or_missing_logfile_disables_logging() {
        assert!(AuditLog::new(Some(""), Path::new("/x"), "-").destination().is_none());
        assert!(AuditLog::new(None, Path::new("/x"), "-").destination().is_none());
        assert!(AuditLog::disabled().info("ignored").is_ok());
    }

    #[test]
    fn writes_append_and_never_truncate() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(Some("enrol.log"), dir.path(), "127.0.0.1");
        log.info("first").unwrap();
        log.error("second").unwrap();

        let content = std::fs::read_to_string(dir.path().join("enrol.log")).unwrap();
        let lines: Vec<&str> = content.split_terminator("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[client 127.0.0.1] [info] first"));
        assert!(lines[1].ends_with("[client 127.0.0.1] [error] second"));
    }

    #[test]
    fn record_swallows_write_failures() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(Some("missing-dir/enrol.log"), dir.path(), "-");
        log.record(AuditLevel::Error, "still fine");
        assert!(!dir.path().join("missing-dir").exists());
    }

    #[test]
    fn unwritable_destination_reports_path() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(Some("missing-dir/enrol.log"), dir.path(), "-");
        let err = log.info("x").unwrap_err();
        assert!(matches!(err, SyncError::AuditLog { .. }));
        assert!(err.to_string().contains("missing-dir"));
    }
}
