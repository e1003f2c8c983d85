//! # ormforge CLI
//!
//! Command-line interface for ormforge.
//!
//! Reads model definition files (JSON or TOML), builds the model through
//! the default conventions and reports the result.
//!
//! ## Commands
//!
//! - `check` - Build a definition and report validation errors and warnings
//! - `dump` - Print the settled model as JSON or as a readable tree
//! - `conventions` - List the conventions in dispatch order
//!

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub use commands::{check, conventions, dump};

/// CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Build and inspect ORM model definitions
#[derive(Debug, Parser)]
#[command(name = "ormforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Builder configuration file (TOML)
    #[arg(global = true, short, long, env = "ORMFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a definition and report problems
    Check {
        /// Model definition file (.json or .toml)
        definition: PathBuf,
    },

    /// Print the settled model
    Dump {
        /// Model definition file (.json or .toml)
        definition: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the default conventions in dispatch order
    Conventions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

impl Cli {
    /// Parse the process arguments
    pub fn from_env() -> Self {
        Self::parse()
    }
}

/// Run one parsed command
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Check { definition } => check(&definition, config),
        Commands::Dump {
            definition,
            format,
            output,
        } => dump(&definition, config, format, output.as_deref()),
        Commands::Conventions => conventions(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_parse_dump() {
        let cli =
            Cli::try_parse_from(["ormforge", "dump", "model.toml", "--format", "text"]).unwrap();
        match cli.command {
            Commands::Dump { format, output, .. } => {
                assert_eq!(format, OutputFormat::Text);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["ormforge", "conventions", "-v", "-c", "ormforge.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("ormforge.toml")));
    }
}
