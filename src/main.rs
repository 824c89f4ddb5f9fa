//! Emotive CLI - Emotion Sampling Harness
//!
//! Command-line interface for the Emotive frame pipeline.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use emotive::cli::commands;
use emotive::cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Emotive v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Emotive v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Run(args) => {
            commands::run(&args).context("pipeline run failed")?;
        }
        Commands::Summarize { ledger, json } => commands::summarize(&ledger, json)
            .with_context(|| format!("failed to summarize {}", ledger.display()))?,
        Commands::Export {
            ledger,
            output,
            config,
        } => {
            commands::export(&ledger, &output, config.as_deref())
                .with_context(|| format!("failed to export {}", ledger.display()))?;
        }
        Commands::Labels => commands::labels()?,
    }
    Ok(())
}
