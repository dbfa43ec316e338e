//! CLI commands and argument parsing.

pub mod check;
pub mod validate;

use clap::{Parser, Subcommand};

/// Regwall - container registry allow-list
#[derive(Parser)]
#[command(name = "regwall")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Check pull specs or registry hostnames against the allow-list
    Check(check::CheckArgs),

    /// Validate an allow-list configuration
    Validate(validate::ValidateArgs),

    /// Print version information
    Version,
}
