//! Tiling scheme: mapping tile addresses to geographic rectangles.

use std::f64::consts::PI;

use super::types::{Rectangle, TileCoord};

/// Maximum radius of the WGS84 ellipsoid in meters.
pub const WGS84_MAXIMUM_RADIUS: f64 = 6_378_137.0;

/// Maps tile addresses to the geographic area they cover.
///
/// The terrain core only consumes this mapping; it never needs the inverse.
pub trait TilingScheme: Send + Sync {
    /// Geographic rectangle covered by a tile.
    fn tile_rectangle(&self, coord: TileCoord) -> Rectangle;

    /// Number of tile columns at a level.
    fn number_of_x_tiles_at_level(&self, level: u32) -> u32;

    /// Number of tile rows at a level.
    fn number_of_y_tiles_at_level(&self, level: u32) -> u32;

    /// Maximum radius of the ellipsoid the scheme is defined on, in meters.
    fn ellipsoid_maximum_radius(&self) -> f64 {
        WGS84_MAXIMUM_RADIUS
    }
}

/// Equirectangular tiling over the whole globe.
///
/// Level 0 has two tiles side by side (west and east hemispheres); every
/// following level doubles the tile count in both directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeographicTilingScheme {
    rectangle: Rectangle,
    level_zero_tiles_x: u32,
    level_zero_tiles_y: u32,
}

impl GeographicTilingScheme {
    /// Create a scheme over `rectangle` with the given level-zero tile grid.
    pub fn new(rectangle: Rectangle, level_zero_tiles_x: u32, level_zero_tiles_y: u32) -> Self {
        Self {
            rectangle,
            level_zero_tiles_x: level_zero_tiles_x.max(1),
            level_zero_tiles_y: level_zero_tiles_y.max(1),
        }
    }

    /// Rectangle covered by the whole scheme.
    pub fn rectangle(&self) -> Rectangle {
        self.rectangle
    }
}

impl Default for GeographicTilingScheme {
    fn default() -> Self {
        Self::new(Rectangle::MAX_VALUE, 2, 1)
    }
}

impl TilingScheme for GeographicTilingScheme {
    fn tile_rectangle(&self, coord: TileCoord) -> Rectangle {
        let x_tiles = self.number_of_x_tiles_at_level(coord.level) as f64;
        let y_tiles = self.number_of_y_tiles_at_level(coord.level) as f64;

        let tile_width = self.rectangle.width() / x_tiles;
        let west = coord.x as f64 * tile_width + self.rectangle.west;
        let east = (coord.x as f64 + 1.0) * tile_width + self.rectangle.west;

        let tile_height = self.rectangle.height() / y_tiles;
        let north = self.rectangle.north - coord.y as f64 * tile_height;
        let south = self.rectangle.north - (coord.y as f64 + 1.0) * tile_height;

        Rectangle::new(west, south, east, north)
    }

    fn number_of_x_tiles_at_level(&self, level: u32) -> u32 {
        scale_tiles(self.level_zero_tiles_x, level)
    }

    fn number_of_y_tiles_at_level(&self, level: u32) -> u32 {
        scale_tiles(self.level_zero_tiles_y, level)
    }
}

fn scale_tiles(level_zero: u32, level: u32) -> u32 {
    1u32.checked_shl(level)
        .map_or(u32::MAX, |factor| level_zero.saturating_mul(factor))
}

/// Estimated geometric error of a level-zero heightmap tile.
///
/// `heightmap_width` is the sample count along one tile edge and
/// `level_zero_tiles_x` the number of level-zero tile columns.
pub fn level_zero_geometric_error(
    ellipsoid_maximum_radius: f64,
    heightmap_width: u32,
    level_zero_tiles_x: u32,
) -> f64 {
    const HEIGHTMAP_TERRAIN_QUALITY: f64 = 0.25;

    ellipsoid_maximum_radius * 2.0 * PI * HEIGHTMAP_TERRAIN_QUALITY
        / (heightmap_width as f64 * level_zero_tiles_x as f64)
}
