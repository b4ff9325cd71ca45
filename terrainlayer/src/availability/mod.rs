//! Tile availability tracking.
//!
//! Answers "does this tile have elevation data?" without fetching or decoding
//! anything. Two sources of truth are consulted in order:
//!
//! 1. Tile ranges known to be available, tracked per level. Level 0 is always
//!    seeded so the root of the quadtree can be traversed.
//! 2. The composed terrain sources: the first source (in priority order) whose
//!    rectangle overlaps the tile decides, based on its maximum level.
//!
//! A tile that no source covers yields `None`, which callers treat as "no
//! data" but which stays distinguishable from a known-empty tile.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::coord::{TileCoord, TilingScheme};
use crate::source::SourceSet;

/// Highest level for which explicit ranges are tracked.
pub const MAX_TRACKED_LEVEL: u32 = 14;

/// Inclusive rectangle of tile addresses at one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub start_x: u32,
    pub start_y: u32,
    pub end_x: u32,
    pub end_y: u32,
}

impl TileRange {
    /// Whether the range includes `(x, y)`.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.start_x..=self.end_x).contains(&x) && (self.start_y..=self.end_y).contains(&y)
    }
}

/// Per-provider availability index.
pub struct AvailabilityIndex {
    sources: Arc<SourceSet>,
    tiling_scheme: Arc<dyn TilingScheme>,
    ranges: RwLock<Vec<Vec<TileRange>>>,
}

impl AvailabilityIndex {
    /// Create an index with level 0 fully available.
    pub fn new(sources: Arc<SourceSet>, tiling_scheme: Arc<dyn TilingScheme>) -> Self {
        let index = Self {
            sources,
            ranges: RwLock::new(vec![Vec::new(); MAX_TRACKED_LEVEL as usize + 1]),
            tiling_scheme,
        };

        let x_tiles = index.tiling_scheme.number_of_x_tiles_at_level(0);
        let y_tiles = index.tiling_scheme.number_of_y_tiles_at_level(0);
        index.add_available_tile_range(0, 0, 0, x_tiles - 1, y_tiles - 1);

        index
    }

    /// Mark an inclusive range of tiles at `level` as available.
    ///
    /// Ranges above [`MAX_TRACKED_LEVEL`] are ignored.
    pub fn add_available_tile_range(&self, level: u32, start_x: u32, start_y: u32, end_x: u32, end_y: u32) {
        if level > MAX_TRACKED_LEVEL {
            tracing::debug!(level, "Ignoring availability range above tracked levels");
            return;
        }

        self.ranges.write()[level as usize].push(TileRange {
            start_x,
            start_y,
            end_x,
            end_y,
        });
    }

    /// Whether a tile falls in an explicitly tracked range.
    pub fn is_in_known_range(&self, coord: TileCoord) -> bool {
        if coord.level > MAX_TRACKED_LEVEL {
            return false;
        }
        self.ranges.read()[coord.level as usize]
            .iter()
            .any(|range| range.contains(coord.x, coord.y))
    }

    /// Whether a tile is expected to have data.
    ///
    /// Returns `Some(true)` for known ranges, `Some(level <= max_level)` of
    /// the first overlapping source, or `None` when no source covers the tile.
    pub fn is_available(&self, coord: TileCoord) -> Option<bool> {
        if self.is_in_known_range(coord) {
            return Some(true);
        }

        let tile = self.tiling_scheme.tile_rectangle(coord);
        self.sources
            .select(&tile)
            .map(|source| coord.level <= source.max_level())
    }
}
