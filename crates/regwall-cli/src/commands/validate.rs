//! Validate command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use regwall_core::{RegistryWhitelister, WhitelistConfig};

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the allow-list configuration
    #[arg(short, long, env = "REGWALL_CONFIG")]
    pub config: PathBuf,

    /// Show the effective entries and alias table
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runs the validate command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or any registry
/// pattern fails to parse.
pub fn run(args: &ValidateArgs) -> Result<()> {
    info!(path = ?args.config, "Validating allow-list");

    let config = WhitelistConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let whitelister = RegistryWhitelister::from_config(&config)?;

    println!("Regwall Allow-list Validator");
    println!("============================");
    println!("Config: {}", args.config.display());
    println!();

    if args.verbose {
        for entry in whitelister.entries() {
            let transport = if entry.is_insecure() { "insecure" } else { "secure" };
            println!("  {entry} ({transport})");
        }
        println!();
        println!("Default registry: {}", whitelister.aliases().default_registry());
        for group in &whitelister.aliases().groups {
            println!("  {} = {}", group.canonical, group.aliases.join(", "));
        }
        println!();
    }

    println!(
        "✓ {} entries from {} configured registries",
        whitelister.entries().len(),
        config.allowed_registries.len()
    );
    Ok(())
}
