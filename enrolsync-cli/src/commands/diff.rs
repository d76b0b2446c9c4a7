//! `enrolsync diff`: unified diff of what sync would change in the snapshot.

use anyhow::{Context, Result};
use clap::Args;
use similar::TextDiff;

use enrolsync_core::snapshot;

use super::RunInputs;

/// Arguments for `enrolsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub inputs: RunInputs,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let run = self.inputs.execute(false)?;

        let before = snapshot::to_yaml(&run.before).context("failed to serialize snapshot")?;
        let after = snapshot::to_yaml(&run.after).context("failed to serialize snapshot")?;
        if before == after {
            println!("No differences for '{}'.", self.inputs.user);
        } else {
            let name = self.inputs.directory.display().to_string();
            let unified = TextDiff::from_lines(&before, &after)
                .unified_diff()
                .header(&format!("a/{name}"), &format!("b/{name}"))
                .context_radius(3)
                .to_string();
            print!("{unified}");
            if !unified.ends_with('\n') {
                println!();
            }
        }

        for (category, message) in run.report.outcome.iter() {
            eprintln!("{category}: {message}");
        }
        Ok(())
    }
}
