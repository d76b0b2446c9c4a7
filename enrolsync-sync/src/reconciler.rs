//! Claim-driven enrolment reconciliation for one user.
//!
//! ## Run order
//!
//! For each claimed role, in claim order:
//!
//! 1. Resolve the role; unknown roles are recorded and skipped.
//! 2. Unenrolment pass over the inactive courses (unless
//!    `ignore_inactive_courses`). A course that is also active is never
//!    unenrolled.
//! 3. Enrolment pass over the active courses, then group assignment.
//!
//! Unresolved courses and the site course are skipped silently. A directory
//! failure stops the run; everything recorded up to that point is kept in
//! the returned [`SyncReport`].

use enrolsync_core::{
    ClaimSet, Course, CourseField, CourseId, DirectoryStore, EnrolmentChannel, EnrolmentStatus,
    Role, SyncConfig, User,
};

use crate::audit::{AuditLevel, AuditLog};
use crate::error::{SyncError, SyncIssue};
use crate::group::GroupReconciler;
use crate::instance::InstanceManager;
use crate::outcome::ENROLLMENT;
use crate::report::{Change, SyncReport};

/// Request-scoped input of one sync run.
///
/// The claims are consumed by [`EnrolmentSync::sync`] and left empty, so a
/// context reused for a later request never carries stale claims.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub user: User,
    pub claims: ClaimSet,
    /// Client address written into audit lines.
    pub remote_addr: String,
}

impl SyncContext {
    pub fn new(user: User, claims: ClaimSet, remote_addr: impl Into<String>) -> Self {
        Self {
            user,
            claims,
            remote_addr: remote_addr.into(),
        }
    }
}

/// The capabilities a host needs from the enrolment sync.
pub trait EnrolmentSync {
    /// Reconcile the context's user against its claims.
    fn sync(&self, ctx: &mut SyncContext) -> SyncReport;

    /// The course's channel, created with configured defaults when absent.
    fn get_or_create_instance(&self, course: &Course)
        -> Result<Option<EnrolmentChannel>, SyncError>;
}

/// [`EnrolmentSync`] over a [`DirectoryStore`].
pub struct ClaimsEnroller<'a, S: DirectoryStore + ?Sized> {
    store: &'a S,
    config: &'a SyncConfig,
}

impl<'a, S: DirectoryStore + ?Sized> ClaimsEnroller<'a, S> {
    pub fn new(store: &'a S, config: &'a SyncConfig) -> Self {
        Self { store, config }
    }

    fn instances(&self) -> InstanceManager<'a, S> {
        InstanceManager::new(self.store, self.config)
    }

    fn sync_roles(
        &self,
        user: &User,
        claims: &ClaimSet,
        audit: &AuditLog,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let prefixes = self.config.prefixes();
        let groups =
            GroupReconciler::new(self.store, audit, &prefixes, &self.config.created_group_info);
        let run = RoleRun {
            store: self.store,
            instances: self.instances(),
            field: self.config.course_field(),
            site: self.store.site_course(),
            user,
            audit,
        };

        for role_name in &claims.mapped_roles {
            let Some(role) = self.store.find_role(role_name)? else {
                tracing::debug!("claimed role {role_name} has no directory role");
                report.outcome.push(
                    ENROLLMENT,
                    SyncIssue::RoleNotFound {
                        role: role_name.clone(),
                    }
                    .to_string(),
                );
                continue;
            };

            let new_course_ids = claims.active_courses(role_name);
            let del_course_ids = claims.inactive_courses(role_name);

            if !self.config.ignore_inactive_courses {
                for course_key in del_course_ids
                    .iter()
                    .filter(|id| !new_course_ids.contains(*id))
                {
                    run.unenrol(&role, course_key, report)?;
                }
            }

            for course_key in &new_course_ids {
                let Some(course) = run.enrol(&role, course_key, report)? else {
                    continue;
                };
                if let Some(claim) = claims.active_claim(role_name, course_key) {
                    report
                        .changes
                        .extend(groups.assign_group(claim, &course, user)?);
                }
            }
        }
        Ok(())
    }
}

impl<S: DirectoryStore + ?Sized> EnrolmentSync for ClaimsEnroller<'_, S> {
    fn sync(&self, ctx: &mut SyncContext) -> SyncReport {
        let claims = std::mem::take(&mut ctx.claims);
        let mut report = SyncReport::default();

        if !self.config.sync_enabled() {
            tracing::debug!("course support disabled, skipping sync for {}", ctx.user.username);
            return report;
        }

        let audit = AuditLog::new(
            self.config.logfile.as_deref(),
            &self.config.data_root,
            ctx.remote_addr.clone(),
        );

        if let Err(err) = self.sync_roles(&ctx.user, &claims, &audit, &mut report) {
            report.outcome.push(ENROLLMENT, err.to_string());
            audit.record(
                AuditLevel::Error,
                &format!("Enrol process for user {} stopped. {err}", ctx.user.username),
            );
            report.aborted = Some(err);
        }
        report
    }

    fn get_or_create_instance(
        &self,
        course: &Course,
    ) -> Result<Option<EnrolmentChannel>, SyncError> {
        self.instances().get_or_create_instance(course)
    }
}

/// Per-run state shared by the two passes.
struct RoleRun<'a, S: DirectoryStore + ?Sized> {
    store: &'a S,
    instances: InstanceManager<'a, S>,
    field: CourseField,
    site: CourseId,
    user: &'a User,
    audit: &'a AuditLog,
}

impl<S: DirectoryStore + ?Sized> RoleRun<'_, S> {
    /// Course for a claim key; `None` when unknown or the site course.
    fn resolve_course(&self, course_key: &str) -> Result<Option<Course>, SyncError> {
        match self.store.find_course(self.field, course_key)? {
            Some(course) if course.id == self.site => {
                tracing::debug!("skipping site course for claim key {course_key}");
                Ok(None)
            }
            Some(course) => Ok(Some(course)),
            None => {
                tracing::debug!("no course with {} = {course_key}", self.field);
                Ok(None)
            }
        }
    }

    fn holds_role(&self, role: &Role, course: &Course) -> Result<bool, SyncError> {
        let context = self.store.course_context(course.id)?;
        Ok(self
            .store
            .has_role_assignment(self.user.id, role.id, context)?)
    }

    fn channel(
        &self,
        course: &Course,
        report: &mut SyncReport,
    ) -> Result<Option<EnrolmentChannel>, SyncError> {
        let Some(found) = self.instances.ensure_instance(course)? else {
            return Ok(None);
        };
        if found.created {
            report.changes.push(Change::ChannelCreated {
                course: course.shortname.clone(),
            });
        }
        Ok(Some(found.channel))
    }

    fn unenrol(
        &self,
        role: &Role,
        course_key: &str,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let Some(course) = self.resolve_course(course_key)? else {
            return Ok(());
        };
        if !self.holds_role(role, &course)? {
            return Ok(());
        }
        let Some(channel) = self.channel(&course, report)? else {
            return Ok(());
        };
        if !self.store.unenrol_user(&channel, self.user.id)? {
            tracing::debug!(
                "{} holds {} in {} without a sync enrolment, leaving it",
                self.user.username,
                role.shortname,
                course.shortname
            );
            return Ok(());
        }
        self.audit.record(
            AuditLevel::Info,
            &format!("{} unenrolled in course {}", self.user.username, course.shortname),
        );
        report.changes.push(Change::Unenrolled {
            course: course.shortname,
            role: role.shortname.clone(),
        });
        Ok(())
    }

    /// Enrol into the course behind `course_key`. Returns the course when a
    /// channel exists for it, so group assignment can follow.
    fn enrol(
        &self,
        role: &Role,
        course_key: &str,
        report: &mut SyncReport,
    ) -> Result<Option<Course>, SyncError> {
        let Some(course) = self.resolve_course(course_key)? else {
            return Ok(None);
        };
        let Some(channel) = self.channel(&course, report)? else {
            report.outcome.push(
                ENROLLMENT,
                SyncIssue::InstanceCreationFailed {
                    role: role.shortname.clone(),
                    course: course.id,
                }
                .to_string(),
            );
            self.audit.record(
                AuditLevel::Error,
                &format!(
                    "error enrolling {} with role {} on course {}",
                    self.user.username, role.shortname, course.shortname
                ),
            );
            return Ok(None);
        };

        if !self.holds_role(role, &course)? {
            self.store
                .enrol_user(&channel, self.user.id, role.id, EnrolmentStatus::Active)?;
            self.audit.record(
                AuditLevel::Info,
                &format!(
                    "{} enrolled in course {} with role {}",
                    self.user.username, course.shortname, role.shortname
                ),
            );
            report.changes.push(Change::Enrolled {
                course: course.shortname.clone(),
                role: role.shortname.clone(),
            });
        }
        Ok(Some(course))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrolsync_core::{
        CourseClaim, DirectorySnapshot, GroupMode, MemoryDirectory, RoleCourses, RoleId,
        SupportCourses, UserId,
    };

    fn snapshot() -> DirectorySnapshot {
        let course = |id: u64, shortname: &str| Course {
            id: CourseId(id),
            shortname: shortname.into(),
            idnumber: String::new(),
            fullname: String::new(),
            group_mode: GroupMode::Separate,
        };
        DirectorySnapshot {
            users: vec![alice()],
            roles: vec![Role {
                id: RoleId(5),
                shortname: "student".into(),
                name: "Student".into(),
            }],
            courses: vec![course(1, "SITE"), course(2, "CS101")],
            ..DirectorySnapshot::default()
        }
    }

    fn alice() -> User {
        User {
            id: UserId(10),
            username: "alice".into(),
        }
    }

    fn claims(active: &[&str]) -> ClaimSet {
        let mut courses = RoleCourses::default();
        for key in active {
            courses.active.insert((*key).to_owned(), CourseClaim::default());
        }
        ClaimSet {
            mapped_roles: vec!["student".into()],
            mapped_courses: [("student".to_owned(), courses)].into_iter().collect(),
        }
    }

    #[test]
    fn nosupport_skips_everything_but_still_clears_claims() {
        let store = MemoryDirectory::new(snapshot());
        let cfg = SyncConfig {
            support_courses: SupportCourses::Nosupport,
            ..SyncConfig::default()
        };
        let mut ctx = SyncContext::new(alice(), claims(&["CS101"]), "-");
        let report = ClaimsEnroller::new(&store, &cfg).sync(&mut ctx);

        assert!(report.changes.is_empty());
        assert!(report.is_clean());
        assert!(ctx.claims.is_empty());
        assert!(store.snapshot().enrolments.is_empty());
    }

    #[test]
    fn site_course_is_never_enrolled() {
        let store = MemoryDirectory::new(snapshot());
        let cfg = SyncConfig::default();
        let mut ctx = SyncContext::new(alice(), claims(&["SITE"]), "-");
        let report = ClaimsEnroller::new(&store, &cfg).sync(&mut ctx);

        assert!(report.is_clean());
        assert!(report.changes.is_empty());
        assert!(store.snapshot().channels.is_empty());
    }

    #[test]
    fn unknown_course_is_silent() {
        let store = MemoryDirectory::new(snapshot());
        let cfg = SyncConfig::default();
        let mut ctx = SyncContext::new(alice(), claims(&["NOPE"]), "-");
        let report = ClaimsEnroller::new(&store, &cfg).sync(&mut ctx);
        assert!(report.is_clean());
        assert!(report.changes.is_empty());
    }

    #[test]
    fn enrol_creates_channel_then_enrols() {
        let store = MemoryDirectory::new(snapshot());
        let cfg = SyncConfig::default();
        let mut ctx = SyncContext::new(alice(), claims(&["CS101"]), "-");
        let report = ClaimsEnroller::new(&store, &cfg).sync(&mut ctx);

        assert_eq!(
            report.changes,
            vec![
                Change::ChannelCreated {
                    course: "CS101".into()
                },
                Change::Enrolled {
                    course: "CS101".into(),
                    role: "student".into()
                },
            ]
        );
        let enrolment = &store.snapshot().enrolments[0];
        assert_eq!(enrolment.status, EnrolmentStatus::Active);
        assert_eq!(enrolment.role, RoleId(5));
    }

    #[test]
    fn trait_object_exposes_instance_creation() {
        let store = MemoryDirectory::new(snapshot());
        let cfg = SyncConfig::default();
        let enroller = ClaimsEnroller::new(&store, &cfg);
        let plugin: &dyn EnrolmentSync = &enroller;
        let course = store
            .find_course(CourseField::Shortname, "CS101")
            .unwrap()
            .unwrap();
        let channel = plugin.get_or_create_instance(&course).unwrap().unwrap();
        assert_eq!(channel.course, CourseId(2));
    }
}
