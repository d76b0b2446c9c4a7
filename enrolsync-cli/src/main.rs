//! enrolsync: apply identity-provider claims to a course directory.
//!
//! # Usage
//!
//! ```text
//! enrolsync sync   --directory <snapshot.yaml> --claims <claims.yaml> --user <name> [--config <path>] [--remote-addr <ip>] [--dry-run] [--json]
//! enrolsync diff   --directory <snapshot.yaml> --claims <claims.yaml> --user <name> [--config <path>]
//! enrolsync status --directory <snapshot.yaml> --user <name> [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "enrolsync",
    version,
    about = "Reconcile course enrolments and groups with login claims",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply a user's claims to a directory snapshot.
    Sync(SyncArgs),

    /// Show the unified diff a sync would make to the snapshot.
    Diff(DiffArgs),

    /// Show a user's enrolments, roles and groups.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
