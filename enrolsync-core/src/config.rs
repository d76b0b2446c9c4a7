//! Sync configuration.
//!
//! Loaded once per run from `~/.enrolsync/config.yaml` (or an explicit path).
//! Every field has a default so a partial file, or an empty one, is valid.
//! Field aliases accept the host platform's setting names.
//!
//! Like the snapshot module, loading has two forms:
//! - `load_at(path)`: explicit path; used in tests
//! - `load()`: derives the path from `dirs::home_dir()`

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{ChannelStatus, CourseField, RoleId};

/// How course claims are handled. `Nosupport` turns the enrolment sync off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupportCourses {
    Nosupport,
    #[default]
    Internal,
    External,
}

/// Group-name prefixes that mark a group as managed by the sync.
///
/// An empty set places no restriction: every group is managed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupPrefixes(Vec<String>);

impl GroupPrefixes {
    /// Parse a comma-separated setting. Entries are trimmed; blanks dropped.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for GroupPrefixes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for GroupPrefixes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// Process-wide settings, read-only during a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    #[serde(alias = "supportcourses")]
    pub support_courses: SupportCourses,

    #[serde(alias = "ignoreinactivecourses")]
    pub ignore_inactive_courses: bool,

    /// Course attribute matched against claim keys; shortname when unset.
    #[serde(alias = "moodlecoursefieldid", skip_serializing_if = "Option::is_none")]
    pub course_field: Option<CourseField>,

    /// Comma-separated managed group prefixes. See [`SyncConfig::prefixes`].
    pub group_prefix: String,

    /// Audit log destination; absolute, or relative to `data_root`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logfile: Option<String>,

    /// Description given to groups the sync creates.
    pub created_group_info: String,

    #[serde(alias = "dataroot")]
    pub data_root: PathBuf,

    /// Create a channel with defaults whenever a course is created.
    #[serde(alias = "defaultenrol")]
    pub default_enrol: bool,

    /// Status of newly created channels.
    pub status: ChannelStatus,

    #[serde(alias = "enrolperiod")]
    pub enrol_period: u64,

    #[serde(alias = "roleid")]
    pub default_role: RoleId,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            support_courses: SupportCourses::default(),
            ignore_inactive_courses: false,
            course_field: None,
            group_prefix: String::new(),
            logfile: None,
            created_group_info: String::new(),
            data_root: PathBuf::from("."),
            default_enrol: true,
            status: ChannelStatus::Enabled,
            enrol_period: 0,
            default_role: RoleId::default(),
        }
    }
}

impl SyncConfig {
    /// Parsed form of `group_prefix`.
    pub fn prefixes(&self) -> GroupPrefixes {
        GroupPrefixes::parse(&self.group_prefix)
    }

    /// Configured course field, defaulting to the shortname.
    pub fn course_field(&self) -> CourseField {
        self.course_field.unwrap_or_default()
    }

    pub fn sync_enabled(&self) -> bool {
        self.support_courses != SupportCourses::Nosupport
    }

    /// Load a config file. Returns `ConfigError::NotFound` if absent.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// `load_at` convenience wrapper reading `~/.enrolsync/config.yaml`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(&default_path()?)
    }
}

/// `<home>/.enrolsync/config.yaml`
pub fn default_path_at(home: &Path) -> PathBuf {
    home.join(".enrolsync").join("config.yaml")
}

/// `default_path_at` convenience wrapper.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    Ok(default_path_at(&home))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
