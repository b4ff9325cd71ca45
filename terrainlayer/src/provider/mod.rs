//! Tile orchestration.
//!
//! [`TiledTerrainProvider`] answers height-tile requests for a tiled globe.
//! Each request picks the highest-priority source covering the tile, fetches
//! the payload (or takes it from the raw cache) and hands it to the shared
//! decode pool.
//!
//! # Request flow
//!
//! ```text
//! request_tile_geometry(x, y, level)
//!   │
//!   ├─ below min level / no source ────────────► Ready(zero grid)
//!   │
//!   ├─ raw cache hit ── schedule ──┬─ Ok ──────► Pending(decode)
//!   │                              └─ saturated ► None (payload kept)
//!   │
//!   └─ fetch ──┬─ throttled ───────────────────► None
//!              └─ Pending(fetch → schedule ──┬─ Ok ─────► grid)
//!                                            └─ saturated ► Ok(None), payload cached
//! ```
//!
//! `None` and `Ok(None)` are backpressure: the caller asks again later. Fetch
//! and decode failures are returned as `Err` and also broadcast as
//! [`TileProviderError`] events.

mod state;
mod terrain;
mod types;

pub use state::TileState;
pub use terrain::TiledTerrainProvider;
pub use types::{
    GridSummary, HeightGrid, PendingGeometry, ProviderConfig, TileGeometry, TileProviderError,
    DEFAULT_PROVIDER_ID, DEFAULT_TILE_CELL_NUM, MAX_TILE_CELL_NUM,
};

use thiserror::Error;

use crate::decode::DecodeError;
use crate::fetch::FetchError;
use crate::source::SourceError;

/// Errors building a provider or resolving a tile.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Invalid source configuration.
    #[error("Invalid terrain sources: {0}")]
    Source(#[from] SourceError),

    /// Tile cell count of zero or above [`MAX_TILE_CELL_NUM`].
    #[error("Tile cell count must be between 1 and {MAX_TILE_CELL_NUM}, got {0}")]
    InvalidTileCellNum(usize),

    /// The payload could not be fetched.
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The payload could not be decoded.
    #[error("Failed to decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },
}
