//! `enrolsync status`: a user's enrolments, roles and groups.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use enrolsync_core::{
    snapshot, ContextId, DirectoryStore, EnrolmentStatus, MemoryDirectory, SyncConfig, User,
};
use enrolsync_sync::{show_enrolme_link, InstanceManager};

use super::find_user;

/// Arguments for `enrolsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Directory snapshot (YAML).
    #[arg(long)]
    pub directory: PathBuf,

    /// Username to inspect.
    #[arg(long)]
    pub user: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct EnrolmentRow {
    #[tabled(rename = "course")]
    course: String,
    #[tabled(rename = "roles")]
    roles: String,
    #[tabled(rename = "channel")]
    channel: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "groups")]
    groups: String,
}

#[derive(Serialize)]
struct StatusJson {
    user: String,
    enrolments: Vec<EnrolmentRow>,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let snap = snapshot::load_at(&self.directory)
            .with_context(|| format!("failed to load directory {}", self.directory.display()))?;
        let store = MemoryDirectory::new(snap);
        let user = find_user(&store, &self.user)?;
        let rows = build_rows(&store, &user)?;

        if self.json {
            let payload = StatusJson {
                user: user.username,
                enrolments: rows,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        println!("{} | {} enrolments", user.username.bold(), rows.len());
        if rows.is_empty() {
            println!("Not enrolled in any course.");
            return Ok(());
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn build_rows(store: &MemoryDirectory, user: &User) -> Result<Vec<EnrolmentRow>> {
    let snap = store.snapshot();
    let config = SyncConfig::default();
    let instances = InstanceManager::new(store, &config);

    let mut rows = Vec::new();
    for (channel, enrolment) in store.enrolments_of(user.id) {
        let course = snap
            .courses
            .iter()
            .find(|c| c.id == channel.course)
            .with_context(|| format!("channel {} points at missing course", channel.id))?;

        let context: ContextId = store.course_context(course.id)?;
        let roles: BTreeSet<&str> = snap
            .role_assignments
            .iter()
            .filter(|ra| ra.user == user.id && ra.context == context)
            .filter_map(|ra| snap.roles.iter().find(|r| r.id == ra.role))
            .map(|r| r.shortname.as_str())
            .collect();
        let groups: Vec<String> = store
            .user_groups(course.id, user.id)?
            .into_iter()
            .map(|g| g.name)
            .collect();

        let mut channel_name = instances.instance_name(&channel)?;
        if !show_enrolme_link(&channel) {
            channel_name.push_str(" [disabled]");
        }

        rows.push(EnrolmentRow {
            course: course.shortname.clone(),
            roles: roles.into_iter().collect::<Vec<_>>().join(","),
            channel: channel_name,
            status: match enrolment.status {
                EnrolmentStatus::Active => "active".to_string(),
                EnrolmentStatus::Suspended => "suspended".to_string(),
            },
            groups: groups.join(","),
        });
    }
    rows.sort_by(|a, b| a.course.cmp(&b.course));
    Ok(rows)
}
