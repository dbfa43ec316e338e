//! Regwall CLI - check images and registries against a registry allow-list.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regwall=info,regwall_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => commands::check::run(&args),
        Commands::Validate(args) => commands::validate::run(&args),
        Commands::Version => {
            println!("regwall {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
