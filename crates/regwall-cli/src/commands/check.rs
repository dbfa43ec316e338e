//! Check command implementation.
//!
//! Builds the baseline allow-list from configuration, takes a copy, applies
//! the per-invocation registries and pins to the copy, then evaluates every
//! target.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use regwall_core::{AdmissionDecision, RegistryWhitelister, Transport, WhitelistConfig};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Path to the allow-list configuration (YAML, or JSON with a .json extension)
    #[arg(short, long, env = "REGWALL_CONFIG")]
    pub config: PathBuf,

    /// Transport the targets will be reached over (secure, insecure, any)
    #[arg(short, long, default_value = "secure")]
    pub transport: Transport,

    /// Treat targets as registry hostnames instead of pull specs
    #[arg(long)]
    pub hostname: bool,

    /// Allow an additional registry for this check only (repeatable)
    #[arg(long = "allow", value_name = "REGISTRY")]
    pub allow: Vec<String>,

    /// Pin a repository for this check only (repeatable)
    #[arg(long = "pin", value_name = "PULL_SPEC")]
    pub pin: Vec<String>,

    /// Print decisions as JSON
    #[arg(long)]
    pub json: bool,

    /// Pull specs or hostnames to check
    #[arg(required = true)]
    pub targets: Vec<String>,
}

/// Runs the check command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, an `--allow` or
/// `--pin` value is malformed, or any target is denied.
pub fn run(args: &CheckArgs) -> Result<()> {
    let decisions = evaluate(args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decisions)?);
    } else {
        for decision in &decisions {
            match &decision.reason {
                None => println!("✓ {}", decision.target),
                Some(reason) => println!("✗ {}: {reason}", decision.target),
            }
        }
    }

    let denied = decisions.iter().filter(|d| d.is_denied()).count();
    if denied > 0 {
        anyhow::bail!("{denied} of {} targets not allowed", decisions.len());
    }
    Ok(())
}

fn evaluate(args: &CheckArgs) -> Result<Vec<AdmissionDecision>> {
    let config = WhitelistConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let baseline = RegistryWhitelister::from_config(&config)?;

    let mut whitelister = baseline.copy();
    for registry in &args.allow {
        whitelister
            .whitelist_registry(registry, args.transport)
            .with_context(|| format!("Invalid --allow value '{registry}'"))?;
    }
    for pull_spec in &args.pin {
        whitelister
            .whitelist_repository(pull_spec)
            .with_context(|| format!("Invalid --pin value '{pull_spec}'"))?;
    }

    info!(
        targets = args.targets.len(),
        transport = %args.transport,
        "Checking targets"
    );

    Ok(args
        .targets
        .iter()
        .map(|target| {
            let result = if args.hostname {
                whitelister.admit_hostname(target, args.transport)
            } else {
                whitelister.admit_pull_spec(target, args.transport)
            };
            debug!(item = %target, allowed = result.is_ok(), "Checked target");
            AdmissionDecision::from_result(target.as_str(), args.transport, &result)
        })
        .collect())
}
