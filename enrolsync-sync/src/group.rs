//! Group membership reconciliation for one user in one course.
//!
//! The claimed group is created on demand and joined. Any other group the
//! user is in is left only when its name passes the prefix matcher, so groups
//! the sync does not manage are never touched.

use enrolsync_core::{Course, CourseClaim, DirectoryStore, GroupPrefixes, NewGroup, User};

use crate::audit::{AuditLevel, AuditLog};
use crate::error::SyncError;
use crate::prefix;
use crate::report::Change;

/// Component recorded on memberships added by the sync.
pub const MEMBER_COMPONENT: &str = "enrol_saml";

pub struct GroupReconciler<'a, S: DirectoryStore + ?Sized> {
    store: &'a S,
    audit: &'a AuditLog,
    prefixes: &'a GroupPrefixes,
    created_group_info: &'a str,
}

impl<'a, S: DirectoryStore + ?Sized> GroupReconciler<'a, S> {
    pub fn new(
        store: &'a S,
        audit: &'a AuditLog,
        prefixes: &'a GroupPrefixes,
        created_group_info: &'a str,
    ) -> Self {
        Self {
            store,
            audit,
            prefixes,
            created_group_info,
        }
    }

    /// Put `user` in the group named by `claim`, leaving other managed groups.
    ///
    /// No-op when the course has groups disabled, the claim names no group,
    /// or the group name is not managed.
    pub fn assign_group(
        &self,
        claim: &CourseClaim,
        course: &Course,
        user: &User,
    ) -> Result<Vec<Change>, SyncError> {
        let mut changes = Vec::new();
        if !course.groups_enabled() {
            return Ok(changes);
        }
        let Some(group_name) = claim.group.as_deref() else {
            return Ok(changes);
        };
        if !prefix::matches(Some(group_name), self.prefixes) {
            tracing::debug!("group {group_name} is not managed, skipping");
            return Ok(changes);
        }

        let target = match self.store.find_group_by_name(course.id, group_name)? {
            Some(group) => group,
            None => {
                let group = self.store.create_group(NewGroup {
                    course: course.id,
                    name: group_name.to_owned(),
                    description: self.created_group_info.to_owned(),
                })?;
                self.audit.record(
                    AuditLevel::Info,
                    &format!("Group {group_name} created on course {}", course.shortname),
                );
                changes.push(Change::GroupCreated {
                    course: course.shortname.clone(),
                    group: group_name.to_owned(),
                });
                group
            }
        };

        let mut found = false;
        for group in self.store.user_groups(course.id, user.id)? {
            if group.id == target.id {
                found = true;
                continue;
            }
            if prefix::matches(Some(&group.name), self.prefixes) {
                self.store.remove_group_member(group.id, user.id)?;
                self.audit.record(
                    AuditLevel::Info,
                    &format!(
                        "{} unassigned from group {} from course {}",
                        user.username, group.name, course.shortname
                    ),
                );
                changes.push(Change::GroupLeft {
                    course: course.shortname.clone(),
                    group: group.name,
                });
            }
        }

        if !found {
            self.store
                .add_group_member(target.id, user.id, MEMBER_COMPONENT)?;
            self.audit.record(
                AuditLevel::Info,
                &format!(
                    "{} assigned to group {group_name} from course {}",
                    user.username, course.shortname
                ),
            );
            changes.push(Change::GroupJoined {
                course: course.shortname.clone(),
                group: group_name.to_owned(),
            });
        }

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrolsync_core::{
        CourseId, DirectorySnapshot, Group, GroupId, GroupMembership, GroupMode, MemoryDirectory,
        UserId,
    };

    fn course(mode: GroupMode) -> Course {
        Course {
            id: CourseId(2),
            shortname: "CS101".into(),
            idnumber: String::new(),
            fullname: String::new(),
            group_mode: mode,
        }
    }

    fn user() -> User {
        User {
            id: UserId(10),
            username: "alice".into(),
        }
    }

    fn group(id: u64, name: &str) -> Group {
        Group {
            id: GroupId(id),
            course: CourseId(2),
            name: name.into(),
            description: String::new(),
        }
    }

    fn member(group: u64) -> GroupMembership {
        GroupMembership {
            group: GroupId(group),
            user: UserId(10),
            component: String::new(),
        }
    }

    fn store(groups: Vec<Group>, memberships: Vec<GroupMembership>) -> MemoryDirectory {
        MemoryDirectory::new(DirectorySnapshot {
            courses: vec![course(GroupMode::Separate)],
            groups,
            memberships,
            ..DirectorySnapshot::default()
        })
    }

    fn group_names(store: &MemoryDirectory) -> Vec<String> {
        let mut names: Vec<String> = store
            .user_groups(CourseId(2), UserId(10))
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn creates_and_joins_missing_group() {
        let store = store(vec![], vec![]);
        let audit = AuditLog::disabled();
        let prefixes = GroupPrefixes::default();
        let reconciler = GroupReconciler::new(&store, &audit, &prefixes, "made by sync");

        let changes = reconciler
            .assign_group(&CourseClaim::with_group("TeamA"), &course(GroupMode::Separate), &user())
            .unwrap();

        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[0], Change::GroupCreated { .. }));
        assert!(matches!(changes[1], Change::GroupJoined { .. }));
        assert_eq!(group_names(&store), vec!["TeamA"]);
        assert_eq!(store.snapshot().groups[0].description, "made by sync");
        assert_eq!(store.snapshot().memberships[0].component, MEMBER_COMPONENT);
    }

    #[test]
    fn already_member_is_untouched() {
        let store = store(vec![group(1, "TeamA")], vec![member(1)]);
        let audit = AuditLog::disabled();
        let prefixes = GroupPrefixes::default();
        let reconciler = GroupReconciler::new(&store, &audit, &prefixes, "");

        let changes = reconciler
            .assign_group(&CourseClaim::with_group("TeamA"), &course(GroupMode::Separate), &user())
            .unwrap();
        assert!(changes.is_empty());
        assert_eq!(group_names(&store), vec!["TeamA"]);
    }

    #[test]
    fn leaves_other_managed_groups_only() {
        let store = store(
            vec![group(1, "team-old"), group(2, "Study buddies"), group(3, "team-new")],
            vec![member(1), member(2)],
        );
        let audit = AuditLog::disabled();
        let prefixes = GroupPrefixes::parse("team-");
        let reconciler = GroupReconciler::new(&store, &audit, &prefixes, "");

        let changes = reconciler
            .assign_group(&CourseClaim::with_group("team-new"), &course(GroupMode::Separate), &user())
            .unwrap();

        assert!(changes.contains(&Change::GroupLeft {
            course: "CS101".into(),
            group: "team-old".into(),
        }));
        assert_eq!(group_names(&store), vec!["Study buddies", "team-new"]);
    }

    #[test]
    fn unmanaged_target_group_is_ignored() {
        let store = store(vec![], vec![]);
        let audit = AuditLog::disabled();
        let prefixes = GroupPrefixes::parse("team-");
        let reconciler = GroupReconciler::new(&store, &audit, &prefixes, "");

        let changes = reconciler
            .assign_group(&CourseClaim::with_group("Other"), &course(GroupMode::Separate), &user())
            .unwrap();
        assert!(changes.is_empty());
        assert!(store.snapshot().groups.is_empty());
    }

    #[test]
    fn no_op_without_group_mode_or_group_key() {
        let store = store(vec![], vec![]);
        let audit = AuditLog::disabled();
        let prefixes = GroupPrefixes::default();
        let reconciler = GroupReconciler::new(&store, &audit, &prefixes, "");

        let disabled = reconciler
            .assign_group(&CourseClaim::with_group("TeamA"), &course(GroupMode::None), &user())
            .unwrap();
        assert!(disabled.is_empty());

        let no_key = reconciler
            .assign_group(&CourseClaim::default(), &course(GroupMode::Visible), &user())
            .unwrap();
        assert!(no_key.is_empty());
        assert!(store.snapshot().groups.is_empty());
    }
}
