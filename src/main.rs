//! ormforge
//!
//! Metadata graph and convention engine for build-time ORM model construction
//!
//! This is the main entry point for the command-line tool.

use ormforge_cli::Cli;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> anyhow::Result<()> {
    let cli = Cli::from_env();

    // Initialize logging; stdout is reserved for command output
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!(version = ormforge_cli::VERSION, "Starting ormforge");
    ormforge_cli::run(cli)
}
