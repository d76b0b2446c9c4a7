//! Domain types for claim-driven enrolment.
//!
//! Everything here is plain data: serializable via serde so the same structs
//! back the directory snapshot file, the claims file, and JSON reports.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Plugin identifier stamped on every enrolment channel created by the sync.
pub const CHANNEL_PLUGIN: &str = "saml";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

id_newtype!(
    /// Directory identifier of a user.
    UserId
);
id_newtype!(
    /// Directory identifier of a course.
    CourseId
);
id_newtype!(
    /// Directory identifier of a role.
    RoleId
);
id_newtype!(
    /// Permission context of a course (role assignments live here).
    ContextId
);
id_newtype!(
    /// Directory identifier of a course group.
    GroupId
);
id_newtype!(
    /// Identifier of an enrolment channel.
    ChannelId
);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Course attribute used to resolve the course keys found in claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseField {
    #[default]
    Shortname,
    Idnumber,
    Id,
    Fullname,
}

impl fmt::Display for CourseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseField::Shortname => write!(f, "shortname"),
            CourseField::Idnumber => write!(f, "idnumber"),
            CourseField::Id => write!(f, "id"),
            CourseField::Fullname => write!(f, "fullname"),
        }
    }
}

/// Group mode of a course. `None` disables group handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    #[default]
    None,
    Separate,
    Visible,
}

/// Whether an enrolment channel accepts enrolments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    #[default]
    Enabled,
    Disabled,
}

/// Status of a single user enrolment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnrolmentStatus {
    #[default]
    Active,
    Suspended,
}

// ---------------------------------------------------------------------------
// Directory records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub shortname: String,
    /// Display name; falls back to the shortname when empty.
    #[serde(default)]
    pub name: String,
}

impl Role {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.shortname
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub shortname: String,
    #[serde(default)]
    pub idnumber: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub group_mode: GroupMode,
}

impl Course {
    /// Value of `field` as it appears in claim keys.
    pub fn field_value(&self, field: CourseField) -> String {
        match field {
            CourseField::Shortname => self.shortname.clone(),
            CourseField::Idnumber => self.idnumber.clone(),
            CourseField::Id => self.id.to_string(),
            CourseField::Fullname => self.fullname.clone(),
        }
    }

    pub fn groups_enabled(&self) -> bool {
        self.group_mode != GroupMode::None
    }
}

/// An enrolment-method instance binding the sync to one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolmentChannel {
    pub id: ChannelId,
    pub course: CourseId,
    pub plugin: String,
    #[serde(default)]
    pub status: ChannelStatus,
    /// Default enrolment duration in seconds, `0` for unlimited.
    #[serde(default)]
    pub enrol_period: u64,
    #[serde(default)]
    pub default_role: RoleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Fields of a channel that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChannel {
    pub course: CourseId,
    pub plugin: String,
    pub status: ChannelStatus,
    pub enrol_period: u64,
    pub default_role: RoleId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrolment {
    pub channel: ChannelId,
    pub user: UserId,
    pub role: RoleId,
    #[serde(default)]
    pub status: EnrolmentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user: UserId,
    pub role: RoleId,
    pub context: ContextId,
    /// Channel that granted the role; `None` for manual assignments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub course: CourseId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub course: CourseId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group: GroupId,
    pub user: UserId,
    /// Component that added the member; empty for manual additions.
    #[serde(default)]
    pub component: String,
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// Per-course payload of a claim. `group` is the only attribute the sync
/// interprets; anything else the identity provider sends is kept verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CourseClaim {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CourseClaim {
    pub fn with_group(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            extra: BTreeMap::new(),
        }
    }
}

/// Active and inactive course keys claimed for one role.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleCourses {
    #[serde(default)]
    pub active: BTreeMap<String, CourseClaim>,
    #[serde(default)]
    pub inactive: BTreeMap<String, CourseClaim>,
}

/// Decoded role and course claims for a single login.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClaimSet {
    #[serde(default)]
    pub mapped_roles: Vec<String>,
    #[serde(default)]
    pub mapped_courses: BTreeMap<String, RoleCourses>,
}

impl ClaimSet {
    pub fn is_empty(&self) -> bool {
        self.mapped_roles.is_empty() && self.mapped_courses.is_empty()
    }

    /// Course keys claimed active for `role` (empty when absent).
    pub fn active_courses(&self, role: &str) -> Vec<String> {
        self.mapped_courses
            .get(role)
            .map(|c| c.active.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Course keys claimed inactive for `role` (empty when absent).
    pub fn inactive_courses(&self, role: &str) -> Vec<String> {
        self.mapped_courses
            .get(role)
            .map(|c| c.inactive.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Active-claim payload of `course_key` for `role`.
    pub fn active_claim(&self, role: &str, course_key: &str) -> Option<&CourseClaim> {
        self.mapped_courses.get(role)?.active.get(course_key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
