//! Enrolment channel management: at most one channel per course.
//!
//! Creation is check-then-insert against the store's uniqueness constraint,
//! not a transaction. Two runs racing on the same course both see "absent";
//! one insert wins and the other gets `None` back. [`InstanceManager::get_or_create_instance`]
//! resolves the loser by looking the winner up again.

use enrolsync_core::{
    ChannelStatus, Course, DirectoryStore, EnrolmentChannel, NewChannel, RoleId, SyncConfig,
    CHANNEL_PLUGIN,
};

use crate::error::SyncError;

/// Display name of the enrolment method.
pub const PLUGIN_NAME: &str = "SAML enrolments";

/// Fields for a new channel; `None` means "use the configured defaults".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelFields {
    pub status: Option<ChannelStatus>,
    pub enrol_period: Option<u64>,
    pub default_role: Option<RoleId>,
}

/// A usable channel and whether it was just created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredInstance {
    pub channel: EnrolmentChannel,
    pub created: bool,
}

/// Looks up and creates the enrolment channel of a course.
pub struct InstanceManager<'a, S: DirectoryStore + ?Sized> {
    store: &'a S,
    config: &'a SyncConfig,
}

impl<'a, S: DirectoryStore + ?Sized> InstanceManager<'a, S> {
    pub fn new(store: &'a S, config: &'a SyncConfig) -> Self {
        Self { store, config }
    }

    /// The enabled channel of `course`, if any.
    pub fn get_instance(&self, course: &Course) -> Result<Option<EnrolmentChannel>, SyncError> {
        Ok(self
            .store
            .find_channels(course.id, CHANNEL_PLUGIN)?
            .into_iter()
            .find(|c| c.status == ChannelStatus::Enabled))
    }

    /// Create a channel for `course`. `None` when one already exists.
    pub fn add_instance(
        &self,
        course: &Course,
        fields: ChannelFields,
    ) -> Result<Option<EnrolmentChannel>, SyncError> {
        if !self.store.find_channels(course.id, CHANNEL_PLUGIN)?.is_empty() {
            return Ok(None);
        }
        let created = self.store.insert_channel_if_absent(NewChannel {
            course: course.id,
            plugin: CHANNEL_PLUGIN.to_owned(),
            status: fields.status.unwrap_or(self.config.status),
            enrol_period: fields.enrol_period.unwrap_or(self.config.enrol_period),
            default_role: fields.default_role.unwrap_or(self.config.default_role),
        })?;
        if let Some(channel) = &created {
            tracing::debug!("created channel {} for course {}", channel.id, course.shortname);
        }
        Ok(created)
    }

    /// Create a channel with the configured status, period and role.
    pub fn add_default_instance(
        &self,
        course: &Course,
    ) -> Result<Option<EnrolmentChannel>, SyncError> {
        self.add_instance(course, ChannelFields::default())
    }

    /// The existing channel, else a new default one.
    ///
    /// Returns `Ok(None)` only when nothing usable exists after a failed
    /// create, e.g. the course's channel is disabled.
    pub fn get_or_create_instance(
        &self,
        course: &Course,
    ) -> Result<Option<EnrolmentChannel>, SyncError> {
        Ok(self.ensure_instance(course)?.map(|found| found.channel))
    }

    /// [`Self::get_or_create_instance`], also reporting whether this call
    /// created the channel.
    pub fn ensure_instance(&self, course: &Course) -> Result<Option<EnsuredInstance>, SyncError> {
        if let Some(channel) = self.get_instance(course)? {
            return Ok(Some(EnsuredInstance {
                channel,
                created: false,
            }));
        }
        if let Some(channel) = self.add_default_instance(course)? {
            return Ok(Some(EnsuredInstance {
                channel,
                created: true,
            }));
        }
        // Lost a creation race, or a non-enabled channel blocks creation.
        Ok(self.get_instance(course)?.map(|channel| EnsuredInstance {
            channel,
            created: false,
        }))
    }

    /// Course-creation hook: add a default channel when `default_enrol` is set.
    pub fn provision_default_instance(
        &self,
        course: &Course,
    ) -> Result<Option<EnrolmentChannel>, SyncError> {
        if !self.config.default_enrol {
            return Ok(None);
        }
        self.add_default_instance(course)
    }

    /// Whether a new channel may be added to `course`.
    pub fn can_add_instance(&self, course: &Course) -> Result<bool, SyncError> {
        Ok(self.store.find_channels(course.id, CHANNEL_PLUGIN)?.is_empty())
    }

    /// Human-readable channel name: the explicit name, else the plugin name
    /// followed by the default role's name when it resolves.
    pub fn instance_name(&self, channel: &EnrolmentChannel) -> Result<String, SyncError> {
        if let Some(name) = channel.name.as_deref().filter(|n| !n.is_empty()) {
            return Ok(name.to_owned());
        }
        match self.store.role(channel.default_role)? {
            Some(role) => Ok(format!("{PLUGIN_NAME} ({})", role.display_name())),
            None => Ok(PLUGIN_NAME.to_owned()),
        }
    }
}

/// Whether users may see a self-enrol link for `channel`.
pub fn show_enrolme_link(channel: &EnrolmentChannel) -> bool {
    channel.status == ChannelStatus::Enabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrolsync_core::{CourseId, DirectorySnapshot, GroupMode, MemoryDirectory, Role};

    fn course() -> Course {
        Course {
            id: CourseId(2),
            shortname: "CS101".into(),
            idnumber: String::new(),
            fullname: String::new(),
            group_mode: GroupMode::None,
        }
    }

    fn store() -> MemoryDirectory {
        MemoryDirectory::new(DirectorySnapshot {
            courses: vec![course()],
            roles: vec![Role {
                id: RoleId(5),
                shortname: "student".into(),
                name: "Student".into(),
            }],
            ..DirectorySnapshot::default()
        })
    }

    fn config() -> SyncConfig {
        SyncConfig {
            enrol_period: 86_400,
            default_role: RoleId(5),
            ..SyncConfig::default()
        }
    }

    #[test]
    fn get_instance_is_none_before_creation() {
        let store = store();
        let cfg = config();
        let manager = InstanceManager::new(&store, &cfg);
        assert!(manager.get_instance(&course()).unwrap().is_none());
    }

    #[test]
    fn get_or_create_uses_configured_defaults() {
        let store = store();
        let cfg = config();
        let manager = InstanceManager::new(&store, &cfg);
        let channel = manager.get_or_create_instance(&course()).unwrap().unwrap();
        assert_eq!(channel.plugin, CHANNEL_PLUGIN);
        assert_eq!(channel.enrol_period, 86_400);
        assert_eq!(channel.default_role, RoleId(5));
        assert_eq!(channel.status, ChannelStatus::Enabled);
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let store = store();
        let cfg = config();
        let manager = InstanceManager::new(&store, &cfg);
        let a = manager.get_or_create_instance(&course()).unwrap().unwrap();
        let b = manager.get_or_create_instance(&course()).unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(store.snapshot().channels.len(), 1);
    }

    #[test]
    fn ensure_reports_creation_once() {
        let store = store();
        let cfg = config();
        let manager = InstanceManager::new(&store, &cfg);
        assert!(manager.ensure_instance(&course()).unwrap().unwrap().created);
        assert!(!manager.ensure_instance(&course()).unwrap().unwrap().created);
    }

    #[test]
    fn add_instance_refuses_second_channel() {
        let store = store();
        let cfg = config();
        let manager = InstanceManager::new(&store, &cfg);
        assert!(manager.add_default_instance(&course()).unwrap().is_some());
        assert!(manager.add_default_instance(&course()).unwrap().is_none());
        assert!(!manager.can_add_instance(&course()).unwrap());
    }

    #[test]
    fn disabled_channel_blocks_creation() {
        let store = store();
        let cfg = config();
        let manager = InstanceManager::new(&store, &cfg);
        let fields = ChannelFields {
            status: Some(ChannelStatus::Disabled),
            ..ChannelFields::default()
        };
        let channel = manager.add_instance(&course(), fields).unwrap().unwrap();
        assert!(!show_enrolme_link(&channel));
        assert!(manager.get_or_create_instance(&course()).unwrap().is_none());
    }

    #[test]
    fn provisioning_respects_default_enrol() {
        let store = store();
        let cfg = SyncConfig {
            default_enrol: false,
            ..config()
        };
        let manager = InstanceManager::new(&store, &cfg);
        assert!(manager.provision_default_instance(&course()).unwrap().is_none());
        assert!(store.snapshot().channels.is_empty());

        let cfg = config();
        let manager = InstanceManager::new(&store, &cfg);
        assert!(manager.provision_default_instance(&course()).unwrap().is_some());
    }

    #[test]
    fn instance_name_uses_role_or_explicit_name() {
        let store = store();
        let cfg = config();
        let manager = InstanceManager::new(&store, &cfg);
        let mut channel = manager.get_or_create_instance(&course()).unwrap().unwrap();
        assert_eq!(manager.instance_name(&channel).unwrap(), "SAML enrolments (Student)");

        channel.default_role = RoleId(99);
        assert_eq!(manager.instance_name(&channel).unwrap(), "SAML enrolments");

        channel.name = Some("Federated cohort".into());
        assert_eq!(manager.instance_name(&channel).unwrap(), "Federated cohort");
    }
}
