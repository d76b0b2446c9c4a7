//! enrolsync core library: domain types, configuration, directory store, errors.
//!
//! - [`types`]: id newtypes, directory records and decoded claims
//! - [`config`]: [`SyncConfig`] and group prefix parsing
//! - [`directory`]: the [`DirectoryStore`] trait and [`MemoryDirectory`]
//! - [`snapshot`]: YAML load / atomic save of a directory snapshot
//! - [`error`]: [`ConfigError`], [`DirectoryError`], [`SnapshotError`]

pub mod config;
pub mod directory;
pub mod error;
pub mod snapshot;
pub mod types;

pub use config::{GroupPrefixes, SupportCourses, SyncConfig};
pub use directory::{DirectorySnapshot, DirectoryStore, MemoryDirectory};
pub use error::{ConfigError, DirectoryError, SnapshotError};
pub use types::{
    ChannelId, ChannelStatus, ClaimSet, ContextId, Course, CourseClaim, CourseField, CourseId,
    Enrolment, EnrolmentChannel, EnrolmentStatus, Group, GroupId, GroupMembership, GroupMode,
    NewChannel, NewGroup, Role, RoleAssignment, RoleCourses, RoleId, User, UserId,
    CHANNEL_PLUGIN,
};
