//! `groundcheck` command-line entry point.
//!
//! Loads `.env`, installs logging, builds the evaluator configuration from
//! file, environment and flags, then dispatches to a subcommand.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .compact()
        .init();

    let config = cli.evaluator_config()?;

    match &cli.command {
        Command::Evaluate(args) => commands::evaluate::run(config, args).await,
        Command::AbTest(args) => commands::ab_test::run(config, args).await,
        Command::Analyze(args) => commands::analyze::run(config, args).await,
        Command::CheckSetup => commands::setup::check(&config),
        Command::ListModels => commands::setup::list_models(&config).await,
    }
}
