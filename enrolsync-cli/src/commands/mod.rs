pub mod diff;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use enrolsync_core::{
    snapshot, ClaimSet, ConfigError, DirectorySnapshot, MemoryDirectory, SyncConfig, User,
};
use enrolsync_sync::{ClaimsEnroller, EnrolmentSync, SyncContext, SyncReport};

/// Inputs shared by `sync` and `diff`.
#[derive(Args, Debug)]
pub struct RunInputs {
    /// Directory snapshot (YAML).
    #[arg(long)]
    pub directory: PathBuf,

    /// Decoded login claims (YAML or JSON).
    #[arg(long)]
    pub claims: PathBuf,

    /// Username of the user who logged in.
    #[arg(long)]
    pub user: String,

    /// Config file; defaults to ~/.enrolsync/config.yaml when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Client address written into audit lines.
    #[arg(long, default_value = "0.0.0.0")]
    pub remote_addr: String,
}

/// A finished run over an in-memory copy of the snapshot.
pub struct Run {
    pub before: DirectorySnapshot,
    pub after: DirectorySnapshot,
    pub report: SyncReport,
}

impl RunInputs {
    /// Load everything and sync. `audit` off disables the audit log.
    pub fn execute(&self, audit: bool) -> Result<Run> {
        let mut config = load_config(self.config.as_deref())?;
        if !audit {
            config.logfile = None;
        }
        let before = snapshot::load_at(&self.directory)
            .with_context(|| format!("failed to load directory {}", self.directory.display()))?;
        let claims = load_claims(&self.claims)?;

        let store = MemoryDirectory::new(before.clone());
        let user = find_user(&store, &self.user)?;
        let mut ctx = SyncContext::new(user, claims, self.remote_addr.clone());
        let report = ClaimsEnroller::new(&store, &config).sync(&mut ctx);

        Ok(Run {
            before,
            after: store.into_snapshot(),
            report,
        })
    }
}

/// Explicit config path, else the default one, else built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    if let Some(path) = path {
        return SyncConfig::load_at(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }
    match SyncConfig::load() {
        Ok(config) => Ok(config),
        Err(ConfigError::NotFound { .. } | ConfigError::HomeNotFound) => {
            Ok(SyncConfig::default())
        }
        Err(err) => Err(err).context("failed to load default config"),
    }
}

pub fn load_claims(path: &Path) -> Result<ClaimSet> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read claims {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(ClaimSet::default());
    }
    serde_yaml::from_str(&raw).with_context(|| format!("failed to parse claims {}", path.display()))
}

pub fn find_user(store: &MemoryDirectory, username: &str) -> Result<User> {
    store
        .user_by_username(username)
        .with_context(|| format!("user '{username}' not found in directory"))
}
