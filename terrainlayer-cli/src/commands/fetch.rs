//! Fetch and decode one tile through a configured provider.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use terrainlayer::config::ConfigFile;
use terrainlayer::decode::DecodeScheduler;
use terrainlayer::fetch::ReqwestFetcher;
use terrainlayer::provider::{HeightGrid, TiledTerrainProvider};

use super::common::print_grid;
use crate::error::CliError;

/// Arguments for the fetch command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Tile column
    pub x: u32,

    /// Tile row
    pub y: u32,

    /// Tile level
    pub level: u32,

    /// Requests to make while the tile is deferred
    #[arg(long, default_value_t = 5)]
    pub attempts: u32,

    /// Delay between deferred requests in milliseconds
    #[arg(long, default_value_t = 250)]
    pub retry_delay_ms: u64,
}

/// Run the fetch command.
pub fn run(args: FetchArgs, config: &ConfigFile) -> Result<(), CliError> {
    if config.sources.is_empty() {
        return Err(CliError::InvalidConfig(
            "No [source:<name>] sections configured".to_string(),
        ));
    }

    let runtime = tokio::runtime::Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))?;
    runtime.block_on(fetch_tile(args, config))
}

async fn fetch_tile(args: FetchArgs, config: &ConfigFile) -> Result<(), CliError> {
    let fetcher = ReqwestFetcher::with_limits(
        config.terrain.max_concurrent_requests,
        config.terrain.request_timeout_secs,
    )
    .map_err(CliError::Http)?;
    let decoder = DecodeScheduler::new(config.terrain.decode_concurrency);
    let provider = TiledTerrainProvider::new(
        config.provider_config(),
        Arc::new(fetcher),
        Arc::new(decoder),
    )?;

    println!("Provider: {}", provider.id());
    match provider.tile_data_available(args.x, args.y, args.level) {
        Some(true) => println!("Tile:     L{}/{}/{} (available)", args.level, args.x, args.y),
        Some(false) => println!("Tile:     L{}/{}/{} (beyond source levels)", args.level, args.x, args.y),
        None => println!("Tile:     L{}/{}/{} (no covering source)", args.level, args.x, args.y),
    }

    let grid = request_with_retries(&provider, &args).await?;
    print_grid(&grid);
    println!("Activity: {}", provider.metrics().snapshot());
    Ok(())
}

async fn request_with_retries(
    provider: &TiledTerrainProvider,
    args: &FetchArgs,
) -> Result<HeightGrid, CliError> {
    let delay = Duration::from_millis(args.retry_delay_ms);

    for attempt in 1..=args.attempts {
        if let Some(geometry) = provider.request_tile_geometry(args.x, args.y, args.level) {
            if let Some(grid) = geometry.resolve().await? {
                return Ok(grid);
            }
        }

        tracing::debug!(attempt, "Tile deferred, retrying");
        if attempt < args.attempts {
            tokio::time::sleep(delay).await;
        }
    }

    Err(CliError::Deferred {
        attempts: args.attempts,
    })
}
