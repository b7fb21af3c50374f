// ABOUTME: Entry point for the bluegreen CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use bluegreen::config::Config;
use bluegreen::error::Result;
use bluegreen::output::{Output, OutputMode};
use clap::Parser;
use cli::{Cli, Commands};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => Config::load(path)?,
        None => Config::discover(&env::current_dir()?)?,
    };
    let output = Output::new(mode);

    match cli.command {
        Commands::Pre { tag } => commands::pre(&config, &tag, output).await,
        Commands::Swap => commands::swap(&config, output).await,
        Commands::Status => commands::status(&config, output).await,
    }
}
