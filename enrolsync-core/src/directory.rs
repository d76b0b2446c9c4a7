//! The directory store collaborator and an in-memory implementation.
//!
//! [`DirectoryStore`] is everything the sync needs from the host platform:
//! course and role lookups, role-assignment checks, enrolment channels,
//! enrolments and groups. Calls are blocking. Methods take `&self`; a store
//! owns its synchronization the way a connection pool does.
//!
//! [`MemoryDirectory`] keeps a [`DirectorySnapshot`] behind a lock. It backs
//! the tests and the CLI; it is not meant as a production persistence layer.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;
use crate::types::{
    ChannelId, ContextId, Course, CourseField, CourseId, Enrolment, EnrolmentChannel,
    EnrolmentStatus, Group, GroupId, GroupMembership, NewChannel, NewGroup, Role, RoleAssignment,
    RoleId, User, UserId,
};

/// Host persistence operations used by the enrolment sync.
pub trait DirectoryStore {
    /// Course whose `field` equals `value`.
    fn find_course(&self, field: CourseField, value: &str)
        -> Result<Option<Course>, DirectoryError>;

    /// The site-wide root course; never enrolled into by the sync.
    fn site_course(&self) -> CourseId;

    fn find_role(&self, shortname: &str) -> Result<Option<Role>, DirectoryError>;

    fn role(&self, id: RoleId) -> Result<Option<Role>, DirectoryError>;

    /// Permission context of `course`.
    fn course_context(&self, course: CourseId) -> Result<ContextId, DirectoryError>;

    fn has_role_assignment(
        &self,
        user: UserId,
        role: RoleId,
        context: ContextId,
    ) -> Result<bool, DirectoryError>;

    /// Channels of `plugin` attached to `course`, in creation order.
    fn find_channels(
        &self,
        course: CourseId,
        plugin: &str,
    ) -> Result<Vec<EnrolmentChannel>, DirectoryError>;

    /// Insert a channel unless one of the same plugin already exists for the
    /// course. Returns `None` when the insert lost to an existing row.
    fn insert_channel_if_absent(
        &self,
        channel: NewChannel,
    ) -> Result<Option<EnrolmentChannel>, DirectoryError>;

    /// Enrol `user` through `channel` and grant `role` in the course context.
    fn enrol_user(
        &self,
        channel: &EnrolmentChannel,
        user: UserId,
        role: RoleId,
        status: EnrolmentStatus,
    ) -> Result<(), DirectoryError>;

    /// Remove `user`'s enrolment through `channel` and the roles it granted.
    /// Returns `false` when there was no such enrolment.
    fn unenrol_user(&self, channel: &EnrolmentChannel, user: UserId)
        -> Result<bool, DirectoryError>;

    fn find_group_by_name(
        &self,
        course: CourseId,
        name: &str,
    ) -> Result<Option<Group>, DirectoryError>;

    fn create_group(&self, group: NewGroup) -> Result<Group, DirectoryError>;

    /// Groups of `course` that `user` belongs to.
    fn user_groups(&self, course: CourseId, user: UserId) -> Result<Vec<Group>, DirectoryError>;

    fn add_group_member(
        &self,
        group: GroupId,
        user: UserId,
        component: &str,
    ) -> Result<(), DirectoryError>;

    fn remove_group_member(&self, group: GroupId, user: UserId) -> Result<(), DirectoryError>;
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

fn default_site_course() -> CourseId {
    CourseId(1)
}

/// Whole-directory state of a [`MemoryDirectory`].
///
/// The context of course `n` is `ContextId(n)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default = "default_site_course")]
    pub site_course: CourseId,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub role_assignments: Vec<RoleAssignment>,
    #[serde(default)]
    pub channels: Vec<EnrolmentChannel>,
    #[serde(default)]
    pub enrolments: Vec<Enrolment>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub memberships: Vec<GroupMembership>,
}

impl Default for DirectorySnapshot {
    fn default() -> Self {
        Self {
            site_course: default_site_course(),
            users: vec![],
            roles: vec![],
            courses: vec![],
            role_assignments: vec![],
            channels: vec![],
            enrolments: vec![],
            groups: vec![],
            memberships: vec![],
        }
    }
}

impl DirectorySnapshot {
    fn context_of(&self, course: CourseId) -> Result<ContextId, DirectoryError> {
        if self.courses.iter().any(|c| c.id == course) {
            Ok(ContextId(course.0))
        } else {
            Err(DirectoryError::MissingCourse(course))
        }
    }

    fn next_channel_id(&self) -> ChannelId {
        ChannelId(self.channels.iter().map(|c| c.id.0).max().unwrap_or(0) + 1)
    }

    fn next_group_id(&self) -> GroupId {
        GroupId(self.groups.iter().map(|g| g.id.0).max().unwrap_or(0) + 1)
    }
}

// ---------------------------------------------------------------------------
// MemoryDirectory
// ---------------------------------------------------------------------------

/// Lock-guarded in-memory [`DirectoryStore`].
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: RwLock<DirectorySnapshot>,
}

impl MemoryDirectory {
    pub fn new(snapshot: DirectorySnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> DirectorySnapshot {
        self.state.read().clone()
    }

    pub fn into_snapshot(self) -> DirectorySnapshot {
        self.state.into_inner()
    }

    pub fn user_by_username(&self, username: &str) -> Option<User> {
        self.state
            .read()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    /// Enrolments of `user` in any status, paired with their channel.
    pub fn enrolments_of(&self, user: UserId) -> Vec<(EnrolmentChannel, Enrolment)> {
        let state = self.state.read();
        state
            .enrolments
            .iter()
            .filter(|e| e.user == user)
            .filter_map(|e| {
                state
                    .channels
                    .iter()
                    .find(|c| c.id == e.channel)
                    .map(|c| (c.clone(), e.clone()))
            })
            .collect()
    }
}

impl DirectoryStore for MemoryDirectory {
    fn find_course(
        &self,
        field: CourseField,
        value: &str,
    ) -> Result<Option<Course>, DirectoryError> {
        Ok(self
            .state
            .read()
            .courses
            .iter()
            .find(|c| c.field_value(field) == value)
            .cloned())
    }

    fn site_course(&self) -> CourseId {
        self.state.read().site_course
    }

    fn find_role(&self, shortname: &str) -> Result<Option<Role>, DirectoryError> {
        Ok(self
            .state
            .read()
            .roles
            .iter()
            .find(|r| r.shortname == shortname)
            .cloned())
    }

    fn role(&self, id: RoleId) -> Result<Option<Role>, DirectoryError> {
        Ok(self.state.read().roles.iter().find(|r| r.id == id).cloned())
    }

    fn course_context(&self, course: CourseId) -> Result<ContextId, DirectoryError> {
        self.state.read().context_of(course)
    }

    fn has_role_assignment(
        &self,
        user: UserId,
        role: RoleId,
        context: ContextId,
    ) -> Result<bool, DirectoryError> {
        Ok(self
            .state
            .read()
            .role_assignments
            .iter()
            .any(|ra| ra.user == user && ra.role == role && ra.context == context))
    }

    fn find_channels(
        &self,
        course: CourseId,
        plugin: &str,
    ) -> Result<Vec<EnrolmentChannel>, DirectoryError> {
        Ok(self
            .state
            .read()
            .channels
            .iter()
            .filter(|c| c.course == course && c.plugin == plugin)
            .cloned()
            .collect())
    }

    fn insert_channel_if_absent(
        &self,
        channel: NewChannel,
    ) -> Result<Option<EnrolmentChannel>, DirectoryError> {
        // Check and insert under one write lock: the uniqueness constraint.
        let mut state = self.state.write();
        state.context_of(channel.course)?;
        if state
            .channels
            .iter()
            .any(|c| c.course == channel.course && c.plugin == channel.plugin)
        {
            return Ok(None);
        }
        let created = EnrolmentChannel {
            id: state.next_channel_id(),
            course: channel.course,
            plugin: channel.plugin,
            status: channel.status,
            enrol_period: channel.enrol_period,
            default_role: channel.default_role,
            name: None,
        };
        state.channels.push(created.clone());
        Ok(Some(created))
    }

    fn enrol_user(
        &self,
        channel: &EnrolmentChannel,
        user: UserId,
        role: RoleId,
        status: EnrolmentStatus,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.write();
        let context = state.context_of(channel.course)?;

        match state
            .enrolments
            .iter_mut()
            .find(|e| e.channel == channel.id && e.user == user)
        {
            Some(existing) => {
                existing.role = role;
                existing.status = status;
            }
            None => state.enrolments.push(Enrolment {
                channel: channel.id,
                user,
                role,
                status,
            }),
        }

        let assigned = state.role_assignments.iter().any(|ra| {
            ra.user == user && ra.role == role && ra.context == context && ra.channel == Some(channel.id)
        });
        if !assigned {
            state.role_assignments.push(RoleAssignment {
                user,
                role,
                context,
                channel: Some(channel.id),
            });
        }
        Ok(())
    }

    fn unenrol_user(
        &self,
        channel: &EnrolmentChannel,
        user: UserId,
    ) -> Result<bool, DirectoryError> {
        let mut state = self.state.write();
        let context = state.context_of(channel.course)?;

        let before = state.enrolments.len();
        state
            .enrolments
            .retain(|e| !(e.channel == channel.id && e.user == user));
        if state.enrolments.len() == before {
            return Ok(false);
        }

        state
            .role_assignments
            .retain(|ra| !(ra.user == user && ra.channel == Some(channel.id)));

        // Last enrolment in the course gone: drop every role held there.
        let course_channels: Vec<ChannelId> = state
            .channels
            .iter()
            .filter(|c| c.course == channel.course)
            .map(|c| c.id)
            .collect();
        let still_enrolled = state
            .enrolments
            .iter()
            .any(|e| e.user == user && course_channels.contains(&e.channel));
        if !still_enrolled {
            state
                .role_assignments
                .retain(|ra| !(ra.user == user && ra.context == context));
        }
        Ok(true)
    }

    fn find_group_by_name(
        &self,
        course: CourseId,
        name: &str,
    ) -> Result<Option<Group>, DirectoryError> {
        Ok(self
            .state
            .read()
            .groups
            .iter()
            .find(|g| g.course == course && g.name == name)
            .cloned())
    }

    fn create_group(&self, group: NewGroup) -> Result<Group, DirectoryError> {
        let mut state = self.state.write();
        state.context_of(group.course)?;
        let created = Group {
            id: state.next_group_id(),
            course: group.course,
            name: group.name,
            description: group.description,
        };
        state.groups.push(created.clone());
        Ok(created)
    }

    fn user_groups(&self, course: CourseId, user: UserId) -> Result<Vec<Group>, DirectoryError> {
        let state = self.state.read();
        Ok(state
            .groups
            .iter()
            .filter(|g| g.course == course)
            .filter(|g| {
                state
                    .memberships
                    .iter()
                    .any(|m| m.group == g.id && m.user == user)
            })
            .cloned()
            .collect())
    }

    fn add_group_member(
        &self,
        group: GroupId,
        user: UserId,
        component: &str,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.write();
        if !state.groups.iter().any(|g| g.id == group) {
            return Err(DirectoryError::Backend(format!("group {group} does not exist")));
        }
        if !state
            .memberships
            .iter()
            .any(|m| m.group == group && m.user == user)
        {
            state.memberships.push(GroupMembership {
                group,
                user,
                component: component.to_owned(),
            });
        }
        Ok(())
    }

    fn remove_group_member(&self, group: GroupId, user: UserId) -> Result<(), DirectoryError> {
        self.state
            .write()
            .memberships
            .retain(|m| !(m.group == group && m.user == user));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
