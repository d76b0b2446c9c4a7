//! `enrolsync sync`: apply claims and write the snapshot back.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use enrolsync_core::snapshot;
use enrolsync_sync::{Change, SyncOutcome, SyncReport};

use super::RunInputs;

/// Arguments for `enrolsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub inputs: RunInputs,

    /// Report what would change without saving the snapshot or writing the audit log.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SyncJson<'a> {
    user: &'a str,
    dry_run: bool,
    changes: &'a [Change],
    outcome: &'a SyncOutcome,
    aborted: Option<String>,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let run = self.inputs.execute(!self.dry_run)?;

        if !self.dry_run && run.after != run.before {
            snapshot::save_at(&self.inputs.directory, &run.after).with_context(|| {
                format!("failed to save directory {}", self.inputs.directory.display())
            })?;
        }

        if self.json {
            let payload = SyncJson {
                user: &self.inputs.user,
                dry_run: self.dry_run,
                changes: &run.report.changes,
                outcome: &run.report.outcome,
                aborted: run.report.aborted.as_ref().map(ToString::to_string),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize sync JSON")?
            );
            return Ok(());
        }

        print_report(&self.inputs.user, &run.report, self.dry_run);
        Ok(())
    }
}

fn print_report(user: &str, report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };

    if report.changes.is_empty() && report.is_clean() {
        println!("{prefix}✓ '{user}': nothing to do");
        return;
    }

    let mark = if report.aborted.is_some() {
        "✗".red()
    } else {
        "✓".green()
    };
    println!(
        "{prefix}{mark} '{user}' synced ({} changes, {} issues)",
        report.changes.len(),
        report.outcome.len()
    );

    for change in &report.changes {
        match change {
            Change::Unenrolled { .. } | Change::GroupLeft { .. } => {
                println!("  {}  {change}", "-".red())
            }
            _ => println!("  {}  {change}", "+".green()),
        }
    }
    for (category, message) in report.outcome.iter() {
        println!("  {}  {category}: {message}", "!".yellow());
    }
    if let Some(err) = &report.aborted {
        println!("{}", format!("sync stopped early: {err}").red());
    }
}
