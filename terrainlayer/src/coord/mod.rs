//! Tile coordinates and geographic tiling.
//!
//! Provides the tile address type shared by every stage of the terrain
//! pipeline, geographic rectangles in radians, and the tiling scheme that maps
//! one onto the other.

mod tiling;
mod types;

pub use tiling::{level_zero_geometric_error, GeographicTilingScheme, TilingScheme, WGS84_MAXIMUM_RADIUS};
pub use types::{Rectangle, TileCoord};
