//! TerrainLayer CLI - Command-line interface
//!
//! Decode terrain packets, inspect configured source coverage and fetch tiles
//! through a provider.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use terrainlayer::logging::{init_logging, LogConfig, LoggingGuard};

use commands::common::load_config;
use commands::coverage::CoverageArgs;
use commands::decode::DecodeArgs;
use commands::fetch::FetchArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "terrainlayer")]
#[command(version = terrainlayer::VERSION)]
#[command(about = "Multi-source terrain tiles for tiled globes", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.config/terrainlayer/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a terrain packet file and print the height grid
    Decode(DecodeArgs),

    /// Show configured sources and their combined coverage
    Coverage(CoverageArgs),

    /// Fetch and decode one tile from the configured sources
    Fetch(FetchArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;
    let _logging = setup_logging(config.log_config(), cli.verbose, cli.log_file)?;

    match cli.command {
        Commands::Decode(args) => commands::decode::run(args),
        Commands::Coverage(args) => commands::coverage::run(args, &config),
        Commands::Fetch(args) => commands::fetch::run(args, &config),
    }
}

fn setup_logging(
    config: LogConfig,
    verbose: bool,
    log_file: Option<PathBuf>,
) -> Result<LoggingGuard, CliError> {
    let config = if verbose { config.with_level("debug") } else { config };
    let config = match log_file {
        Some(path) => config.with_file(path),
        None => config,
    };
    Ok(init_logging(&config)?)
}
