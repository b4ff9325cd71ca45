//! TerrainLayer - multi-source terrain tiles for tiled globes
//!
//! This library fetches quantized, compressed elevation tiles from several
//! prioritized terrain services and decodes them into height grids for a
//! globe renderer.
//!
//! # Components
//!
//! ```text
//! TiledTerrainProvider ──► SourceSet (selection, URL templates)
//!        │                 AvailabilityIndex (existence queries)
//!        │
//!        ├──► TileFetcher ──► RawBufferCache (payloads waiting for a slot)
//!        │
//!        └──► DecodePool ──► codec::decode_packet ──► HeightGrid
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use terrainlayer::config::ConfigFile;
//! use terrainlayer::decode::DecodeScheduler;
//! use terrainlayer::fetch::ReqwestFetcher;
//! use terrainlayer::provider::TiledTerrainProvider;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigFile::load("terrainlayer.ini")?;
//! let provider = TiledTerrainProvider::new(
//!     config.provider_config(),
//!     Arc::new(ReqwestFetcher::new()?),
//!     Arc::new(DecodeScheduler::new(config.terrain.decode_concurrency)),
//! )?;
//!
//! if let Some(geometry) = provider.request_tile_geometry(3, 1, 2) {
//!     if let Some(grid) = geometry.resolve().await? {
//!         println!("{}", grid.summary());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod availability;
pub mod cache;
pub mod codec;
pub mod config;
pub mod coord;
pub mod decode;
pub mod fetch;
pub mod logging;
pub mod provider;
pub mod source;
pub mod telemetry;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
