//! Provider data types: height grids, geometry results and configuration.

use std::fmt;

use futures::future::BoxFuture;

use crate::coord::TileCoord;
use crate::source::TerrainSource;

use super::ProviderError;

/// Default samples along one tile edge.
pub const DEFAULT_TILE_CELL_NUM: usize = 33;

/// Largest accepted tile cell count.
pub const MAX_TILE_CELL_NUM: usize = 4097;

/// Default provider identifier.
pub const DEFAULT_PROVIDER_ID: &str = "terrain";

/// Square grid of heights in meters, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    heights: Vec<f32>,
    width: usize,
    height: usize,
}

impl HeightGrid {
    /// Wrap decoded heights.
    ///
    /// Returns `None` unless `heights` holds exactly `width * width` samples.
    pub fn new(heights: Vec<f32>, width: usize) -> Option<Self> {
        if Some(heights.len()) != width.checked_mul(width) {
            return None;
        }
        Some(Self {
            heights,
            width,
            height: width,
        })
    }

    /// A grid of zeros, used wherever no data is available.
    pub fn zeroed(width: usize) -> Self {
        Self {
            heights: vec![0.0; width * width],
            width,
            height: width,
        }
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn into_heights(self) -> Vec<f32> {
        self.heights
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Height at column `col`, row `row`.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.heights.get(row * self.width + col).copied()
    }

    /// Whether every sample is zero.
    pub fn is_zeroed(&self) -> bool {
        self.heights.iter().all(|h| *h == 0.0)
    }

    /// Minimum, maximum and mean height.
    pub fn summary(&self) -> GridSummary {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        for h in &self.heights {
            min = min.min(*h);
            max = max.max(*h);
            sum += *h as f64;
        }
        let mean = if self.heights.is_empty() {
            0.0
        } else {
            sum / self.heights.len() as f64
        };
        GridSummary { min, max, mean }
    }
}

/// Basic statistics over a [`HeightGrid`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSummary {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
}

impl fmt::Display for GridSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "min {:.2} m, max {:.2} m, mean {:.2} m", self.min, self.max, self.mean)
    }
}

/// Deferred geometry result.
///
/// `Ok(None)` means decode was saturated; the payload is cached and the tile
/// should be requested again.
pub type PendingGeometry = BoxFuture<'static, Result<Option<HeightGrid>, ProviderError>>;

/// Result of a tile geometry request.
pub enum TileGeometry {
    /// Available immediately, always a zero grid.
    Ready(HeightGrid),
    /// Fetch and decode in progress.
    Pending(PendingGeometry),
}

impl TileGeometry {
    /// Wait for the geometry.
    pub async fn resolve(self) -> Result<Option<HeightGrid>, ProviderError> {
        match self {
            TileGeometry::Ready(grid) => Ok(Some(grid)),
            TileGeometry::Pending(pending) => pending.await,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TileGeometry::Ready(_))
    }
}

impl fmt::Debug for TileGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileGeometry::Ready(grid) => f.debug_tuple("Ready").field(grid).finish(),
            TileGeometry::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Event raised on the provider's error channel when a tile fails.
#[derive(Debug, Clone, PartialEq)]
pub struct TileProviderError {
    pub provider_id: String,
    pub coord: TileCoord,
    pub url: String,
    /// "An error occurred while accessing <url>."
    pub message: String,
    /// Underlying error text.
    pub detail: String,
}

impl fmt::Display for TileProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {} ({})", self.provider_id, self.coord, self.message, self.detail)
    }
}

/// Provider configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Identifier used in logs and error events.
    pub id: String,
    /// Samples along one tile edge.
    pub tile_cell_num: usize,
    /// Source descriptors, in registration order.
    pub sources: Vec<TerrainSource>,
}

impl ProviderConfig {
    pub fn new(sources: Vec<TerrainSource>) -> Self {
        Self {
            id: DEFAULT_PROVIDER_ID.to_string(),
            tile_cell_num: DEFAULT_TILE_CELL_NUM,
            sources,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tile_cell_num(mut self, tile_cell_num: usize) -> Self {
        self.tile_cell_num = tile_cell_num;
        self
    }

    pub fn with_source(mut self, source: TerrainSource) -> Self {
        self.sources.push(source);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_grid() {
        let grid = HeightGrid::zeroed(33);
        assert_eq!(grid.heights().len(), 33 * 33);
        assert_eq!(grid.width(), 33);
        assert_eq!(grid.height(), 33);
        assert!(grid.is_zeroed());
    }

    #[test]
    fn test_grid_get() {
        let grid = HeightGrid::new(vec![1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert_eq!(grid.get(1, 0), Some(2.0));
        assert_eq!(grid.get(0, 1), Some(3.0));
        assert_eq!(grid.get(2, 0), None);
    }

    #[test]
    fn test_grid_summary() {
        let summary = HeightGrid::new(vec![-10.0, 0.0, 10.0, 40.0], 2).unwrap().summary();
        assert_eq!(summary.min, -10.0);
        assert_eq!(summary.max, 40.0);
        assert!((summary.mean - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_grid_rejects_wrong_length() {
        assert!(HeightGrid::new(vec![1.0, 2.0, 3.0], 2).is_none());
        assert!(HeightGrid::new(vec![0.0; 10], 3).is_none());
        assert!(HeightGrid::new(Vec::new(), usize::MAX).is_none());
        assert!(HeightGrid::new(vec![0.0; 9], 3).is_some());
    }

    #[tokio::test]
    async fn test_ready_geometry_resolves() {
        let geometry = TileGeometry::Ready(HeightGrid::zeroed(3));
        assert!(geometry.is_ready());
        let grid = geometry.resolve().await.unwrap().unwrap();
        assert_eq!(grid.width(), 3);
    }

    #[test]
    fn test_config_builder() {
        let config = ProviderConfig::new(Vec::new())
            .with_id("world")
            .with_tile_cell_num(65);
        assert_eq!(config.id, "world");
        assert_eq!(config.tile_cell_num, 65);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_config_defaults() {
        let config = ProviderConfig::new(Vec::new());
        assert_eq!(config.id, DEFAULT_PROVIDER_ID);
        assert_eq!(config.tile_cell_num, DEFAULT_TILE_CELL_NUM);
    }
}
