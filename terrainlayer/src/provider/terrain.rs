//! The tiled terrain provider.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::availability::AvailabilityIndex;
use crate::cache::{Clock, RawBufferCache, RawCacheEntry, SystemClock};
use crate::coord::{level_zero_geometric_error, GeographicTilingScheme, Rectangle, TileCoord, TilingScheme};
use crate::decode::{DecodeError, DecodeJob, DecodePool, DecodeRequest};
use crate::fetch::{FetchJob, TileFetcher};
use crate::source::{ComposedSource, SourceSet};
use crate::telemetry::TerrainMetrics;

use super::state::{StateGuard, TileState, TileStates};
use super::types::{HeightGrid, ProviderConfig, TileGeometry, TileProviderError, MAX_TILE_CELL_NUM};
use super::ProviderError;

/// Heightmap sample count assumed by the geometric error estimate.
const GEOMETRIC_ERROR_HEIGHTMAP_WIDTH: u32 = 65;

/// Buffered error events per subscriber.
const ERROR_CHANNEL_CAPACITY: usize = 64;

/// Terrain provider drawing height tiles from several prioritized sources.
pub struct TiledTerrainProvider {
    id: Arc<str>,
    width: usize,
    sources: Arc<SourceSet>,
    tiling_scheme: Arc<dyn TilingScheme>,
    availability: AvailabilityIndex,
    raw_cache: Arc<RawBufferCache>,
    fetcher: Arc<dyn TileFetcher>,
    decode_pool: Arc<dyn DecodePool>,
    states: Arc<TileStates>,
    metrics: Arc<TerrainMetrics>,
    errors: broadcast::Sender<TileProviderError>,
    level_zero_error: f64,
}

impl TiledTerrainProvider {
    /// Build a provider on the default geographic tiling scheme.
    ///
    /// # Errors
    ///
    /// Fails when the source list is empty or invalid, or the tile cell count
    /// is zero or above [`MAX_TILE_CELL_NUM`].
    pub fn new(
        config: ProviderConfig,
        fetcher: Arc<dyn TileFetcher>,
        decode_pool: Arc<dyn DecodePool>,
    ) -> Result<Self, ProviderError> {
        Self::with_components(
            config,
            fetcher,
            decode_pool,
            Arc::new(GeographicTilingScheme::default()),
            Arc::new(SystemClock),
        )
    }

    /// Build a provider with an explicit tiling scheme and cache clock.
    pub fn with_components(
        config: ProviderConfig,
        fetcher: Arc<dyn TileFetcher>,
        decode_pool: Arc<dyn DecodePool>,
        tiling_scheme: Arc<dyn TilingScheme>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ProviderError> {
        if config.tile_cell_num == 0 || config.tile_cell_num > MAX_TILE_CELL_NUM {
            return Err(ProviderError::InvalidTileCellNum(config.tile_cell_num));
        }

        let sources = Arc::new(SourceSet::compose(config.sources)?);
        let availability = AvailabilityIndex::new(Arc::clone(&sources), Arc::clone(&tiling_scheme));
        let level_zero_error = level_zero_geometric_error(
            tiling_scheme.ellipsoid_maximum_radius(),
            GEOMETRIC_ERROR_HEIGHTMAP_WIDTH,
            tiling_scheme.number_of_x_tiles_at_level(0),
        );
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);

        tracing::info!(
            provider = %config.id,
            sources = sources.sources().len(),
            min_level = sources.min_level(),
            max_level = sources.max_level(),
            width = config.tile_cell_num,
            "Created tiled terrain provider"
        );

        Ok(Self {
            id: Arc::from(config.id),
            width: config.tile_cell_num,
            sources,
            tiling_scheme,
            availability,
            raw_cache: Arc::new(RawBufferCache::with_clock(clock)),
            fetcher,
            decode_pool,
            states: Arc::new(TileStates::new()),
            metrics: Arc::new(TerrainMetrics::new()),
            errors,
            level_zero_error,
        })
    }

    /// Request the height grid for a tile.
    ///
    /// Returns `None` when the request was deferred because the network layer
    /// is throttled, or because a cached payload could not get a decode slot.
    /// Call again later in both cases.
    pub fn request_tile_geometry(&self, x: u32, y: u32, level: u32) -> Option<TileGeometry> {
        self.metrics.request_received();
        let coord = TileCoord::new(x, y, level);

        if level < self.sources.min_level() {
            return Some(self.empty_tile());
        }

        let tile_rectangle = self.tiling_scheme.tile_rectangle(coord);
        let source = match self.sources.select(&tile_rectangle) {
            Some(source) if level >= source.min_level() => source,
            _ => return Some(self.empty_tile()),
        };

        let request = self.tile_request(source, coord);
        let geometry = match self.raw_cache.take(&request.key) {
            Some(entry) => self.decode_cached(request, entry),
            None => self.start_fetch(request),
        };
        self.sweep_raw_cache();
        geometry
    }

    fn decode_cached(&self, request: TileRequest, entry: RawCacheEntry) -> Option<TileGeometry> {
        let coord = request.coord;
        self.metrics.cache_hit();
        tracing::debug!(provider = %self.id, tile = %coord, "Raw terrain cache hit");

        match self.decode_pool.schedule(request.decode_request(entry.buffer.clone())) {
            Ok(job) => {
                let guard = StateGuard::enter(Arc::clone(&self.states), coord, TileState::Decoding);
                Some(TileGeometry::Pending(Box::pin(request.complete_decode(job, guard))))
            }
            Err(_) => {
                self.metrics.decode_saturated();
                if self.raw_cache.restore(request.key, entry) {
                    tracing::debug!(provider = %self.id, tile = %coord, "Decode pool saturated, keeping cached payload");
                    self.states.set(coord, TileState::CachedRaw);
                } else {
                    tracing::debug!(provider = %self.id, tile = %coord, "Decode pool saturated, cached payload expired");
                    self.states.clear(coord);
                }
                None
            }
        }
    }

    fn start_fetch(&self, request: TileRequest) -> Option<TileGeometry> {
        let coord = request.coord;
        let Some(fetch) = self.fetcher.fetch(&request.url) else {
            self.metrics.fetch_throttled();
            tracing::debug!(provider = %self.id, tile = %coord, "Fetch throttled");
            self.states.clear(coord);
            return None;
        };

        self.metrics.fetch_started();
        let guard = StateGuard::enter(Arc::clone(&self.states), coord, TileState::Fetching);
        Some(TileGeometry::Pending(Box::pin(request.fetch_and_decode(fetch, guard))))
    }

    /// Run a due raw cache sweep and forget tile states it settled.
    fn sweep_raw_cache(&self) {
        if self.raw_cache.tidy().is_none() {
            return;
        }
        let pruned = self
            .states
            .prune(|coord| self.raw_cache.contains(&coord.cache_key()));
        if pruned > 0 {
            tracing::debug!(
                provider = %self.id,
                pruned,
                tracked = self.states.len(),
                "Pruned settled tile states"
            );
        }
    }

    /// Whether a tile is expected to have data; `None` when no source covers it.
    pub fn tile_data_available(&self, x: u32, y: u32, level: u32) -> Option<bool> {
        self.availability.is_available(TileCoord::new(x, y, level))
    }

    /// Mark a range of tiles as known to have data.
    pub fn add_available_tile_range(&self, level: u32, start_x: u32, start_y: u32, end_x: u32, end_y: u32) {
        self.availability
            .add_available_tile_range(level, start_x, start_y, end_x, end_y);
    }

    /// Maximum geometric error expected for tiles at `level`.
    pub fn level_maximum_geometric_error(&self, level: u32) -> f64 {
        self.level_zero_error / 2f64.powi(level as i32)
    }

    /// Subscribe to tile failure events.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<TileProviderError> {
        self.errors.subscribe()
    }

    /// Current state of a tile; `None` when not requested.
    pub fn tile_state(&self, coord: TileCoord) -> Option<TileState> {
        self.states.get(coord)
    }

    pub fn metrics(&self) -> &TerrainMetrics {
        &self.metrics
    }

    pub fn raw_cache(&self) -> &RawBufferCache {
        &self.raw_cache
    }

    /// Union of all source rectangles.
    pub fn rectangle(&self) -> Rectangle {
        self.sources.rectangle()
    }

    pub fn min_level(&self) -> u32 {
        self.sources.min_level()
    }

    pub fn max_level(&self) -> u32 {
        self.sources.max_level()
    }

    /// Sources in priority order.
    pub fn sources(&self) -> &[ComposedSource] {
        self.sources.sources()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Samples along one tile edge.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn tiling_scheme(&self) -> &dyn TilingScheme {
        self.tiling_scheme.as_ref()
    }

    fn empty_tile(&self) -> TileGeometry {
        self.metrics.empty_tile();
        TileGeometry::Ready(HeightGrid::zeroed(self.width))
    }

    fn tile_request(&self, source: &ComposedSource, coord: TileCoord) -> TileRequest {
        TileRequest {
            provider_id: Arc::clone(&self.id),
            coord,
            key: coord.cache_key(),
            url: source.tile_url(coord),
            label: source.tile_matrix_label(coord.level),
            width: self.width,
            raw_cache: Arc::clone(&self.raw_cache),
            decode_pool: Arc::clone(&self.decode_pool),
            metrics: Arc::clone(&self.metrics),
            errors: self.errors.clone(),
        }
    }
}

/// Everything a pending request needs once it leaves the provider.
struct TileRequest {
    provider_id: Arc<str>,
    coord: TileCoord,
    key: String,
    url: String,
    label: String,
    width: usize,
    raw_cache: Arc<RawBufferCache>,
    decode_pool: Arc<dyn DecodePool>,
    metrics: Arc<TerrainMetrics>,
    errors: broadcast::Sender<TileProviderError>,
}

impl TileRequest {
    fn decode_request(&self, buffer: Bytes) -> DecodeRequest {
        DecodeRequest {
            buffer,
            width: self.width,
            coord: self.coord,
            label: self.label.clone(),
        }
    }

    async fn fetch_and_decode(
        self,
        fetch: FetchJob,
        guard: StateGuard,
    ) -> Result<Option<HeightGrid>, ProviderError> {
        let buffer = match fetch.await {
            Ok(buffer) => buffer,
            Err(source) => {
                self.report_failure(&source);
                return Err(ProviderError::Fetch {
                    url: self.url,
                    source,
                });
            }
        };

        if buffer.is_empty() {
            tracing::debug!(provider = %self.provider_id, tile = %self.coord, "Empty terrain payload");
            guard.finish(TileState::Decoded);
            return Ok(Some(HeightGrid::zeroed(self.width)));
        }

        match self.decode_pool.schedule(self.decode_request(buffer)) {
            Ok(job) => {
                guard.advance(TileState::Decoding);
                self.complete_decode(job, guard).await
            }
            Err(rejected) => {
                self.metrics.decode_saturated();
                tracing::debug!(
                    provider = %self.provider_id,
                    tile = %self.coord,
                    bytes = rejected.buffer.len(),
                    "Decode pool saturated, caching payload"
                );
                self.raw_cache.add(self.key, rejected.buffer);
                guard.finish(TileState::CachedRaw);
                Ok(None)
            }
        }
    }

    async fn complete_decode(
        self,
        job: DecodeJob,
        guard: StateGuard,
    ) -> Result<Option<HeightGrid>, ProviderError> {
        match job.await {
            Ok(tile) => {
                self.metrics.decode_completed();
                match self.into_grid(tile.heights) {
                    Ok(grid) => {
                        guard.finish(TileState::Decoded);
                        Ok(Some(grid))
                    }
                    Err(source) => {
                        self.report_failure(&source);
                        Err(ProviderError::Decode {
                            url: self.url,
                            source,
                        })
                    }
                }
            }
            Err(source) => {
                self.report_failure(&source);
                Err(ProviderError::Decode {
                    url: self.url,
                    source,
                })
            }
        }
    }

    fn into_grid(&self, heights: Vec<f32>) -> Result<HeightGrid, DecodeError> {
        let actual = heights.len();
        if heights.first().map_or(false, |h| h.is_nan()) {
            self.metrics.corrupt_tile();
            tracing::error!(
                provider = %self.provider_id,
                level = %self.label,
                x = self.coord.x,
                y = self.coord.y,
                "Corrupt terrain tile"
            );
            return Ok(HeightGrid::zeroed(self.width));
        }
        HeightGrid::new(heights, self.width).ok_or(DecodeError::GridSize {
            coord: self.coord,
            expected: self.width * self.width,
            actual,
        })
    }

    fn report_failure(&self, error: &dyn std::error::Error) {
        self.metrics.failure();
        tracing::warn!(
            provider = %self.provider_id,
            tile = %self.coord,
            url = %self.url,
            error = %error,
            "Terrain tile request failed"
        );

        // No subscribers is fine.
        let _ = self.errors.send(TileProviderError {
            provider_id: self.provider_id.to_string(),
            coord: self.coord,
            url: self.url.clone(),
            message: format!("An error occurred while accessing {}.", self.url),
            detail: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::codec::encode_packet;
    use crate::decode::DecodeScheduler;
    use crate::fetch::{FetchError, MockFetcher};
    use crate::source::{TerrainSource, UrlTemplate};
    use std::time::Duration;

    const WIDTH: usize = 5;

    fn world_source(min_level: u32, max_level: u32) -> TerrainSource {
        TerrainSource::new(
            "world",
            Rectangle::MAX_VALUE,
            max_level,
            UrlTemplate::parse("http://dem/{TileMatrix}/{TileRow}/{TileCol}").unwrap(),
        )
        .with_min_level(min_level)
    }

    fn packet(height: f32) -> Vec<u8> {
        encode_packet(&vec![height; WIDTH * WIDTH], WIDTH, 0.0, 0.5).unwrap()
    }

    fn provider(
        fetcher: Arc<MockFetcher>,
        pool: Arc<dyn DecodePool>,
        clock: Arc<ManualClock>,
    ) -> TiledTerrainProvider {
        let config = ProviderConfig::new(vec![world_source(3, 12)]).with_tile_cell_num(WIDTH);
        TiledTerrainProvider::with_components(
            config,
            fetcher,
            pool,
            Arc::new(GeographicTilingScheme::default()),
            clock,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_cell_num_rejected() {
        let config = ProviderConfig::new(vec![world_source(0, 5)]).with_tile_cell_num(0);
        let result = TiledTerrainProvider::new(
            config,
            Arc::new(MockFetcher::ok(Vec::new())),
            Arc::new(DecodeScheduler::new(1)),
        );
        assert!(matches!(result, Err(ProviderError::InvalidTileCellNum(0))));
    }

    #[test]
    fn test_oversized_cell_num_rejected() {
        let config = ProviderConfig::new(vec![world_source(0, 5)]).with_tile_cell_num(MAX_TILE_CELL_NUM + 1);
        let result = TiledTerrainProvider::new(
            config,
            Arc::new(MockFetcher::ok(Vec::new())),
            Arc::new(DecodeScheduler::new(1)),
        );
        assert!(matches!(
            result,
            Err(ProviderError::InvalidTileCellNum(n)) if n == MAX_TILE_CELL_NUM + 1
        ));

        let config = ProviderConfig::new(vec![world_source(0, 5)]).with_tile_cell_num(MAX_TILE_CELL_NUM);
        assert!(TiledTerrainProvider::new(
            config,
            Arc::new(MockFetcher::ok(Vec::new())),
            Arc::new(DecodeScheduler::new(1)),
        )
        .is_ok());
    }

    #[test]
    fn test_empty_sources_rejected() {
        let result = TiledTerrainProvider::new(
            ProviderConfig::new(Vec::new()),
            Arc::new(MockFetcher::ok(Vec::new())),
            Arc::new(DecodeScheduler::new(1)),
        );
        assert!(matches!(result, Err(ProviderError::Source(_))));
    }

    #[tokio::test]
    async fn test_below_min_level_is_zero_grid() {
        let fetcher = Arc::new(MockFetcher::ok(packet(10.0)));
        let provider = provider(fetcher.clone(), Arc::new(DecodeScheduler::new(1)), Arc::new(ManualClock::new()));

        let geometry = provider.request_tile_geometry(0, 0, 1).unwrap();
        assert!(geometry.is_ready());
        let grid = geometry.resolve().await.unwrap().unwrap();
        assert!(grid.is_zeroed());
        assert_eq!(grid.heights().len(), WIDTH * WIDTH);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_and_decode() {
        let fetcher = Arc::new(MockFetcher::ok(packet(42.0)));
        let provider = provider(fetcher.clone(), Arc::new(DecodeScheduler::new(1)), Arc::new(ManualClock::new()));

        let geometry = provider.request_tile_geometry(3, 1, 2).unwrap();
        assert_eq!(provider.tile_state(TileCoord::new(3, 1, 2)), Some(TileState::Fetching));

        let grid = geometry.resolve().await.unwrap().unwrap();
        assert_eq!(grid.heights(), vec![42.0; WIDTH * WIDTH].as_slice());
        assert_eq!(fetcher.urls.lock()[0], "http://dem/2/1/3");
        assert_eq!(provider.tile_state(TileCoord::new(3, 1, 2)), Some(TileState::Decoded));
        assert_eq!(provider.metrics().snapshot().decodes_completed, 1);
    }

    #[tokio::test]
    async fn test_empty_payload_is_zero_grid() {
        let fetcher = Arc::new(MockFetcher::ok(Vec::new()));
        let provider = provider(fetcher, Arc::new(DecodeScheduler::new(1)), Arc::new(ManualClock::new()));

        let grid = provider
            .request_tile_geometry(0, 0, 4)
            .unwrap()
            .resolve()
            .await
            .unwrap()
            .unwrap();
        assert!(grid.is_zeroed());
    }

    #[tokio::test]
    async fn test_cached_payload_expires() {
        let fetcher = Arc::new(MockFetcher::ok(packet(1.0)));
        let clock = Arc::new(ManualClock::new());
        let provider = provider(fetcher.clone(), Arc::new(DecodeScheduler::new(0)), clock.clone());

        let pending = provider.request_tile_geometry(0, 0, 5).unwrap();
        assert!(pending.resolve().await.unwrap().is_none());
        assert_eq!(provider.raw_cache().len(), 1);

        // Another tile's request drives the sweep.
        clock.advance(Duration::from_secs(11));
        let _ = provider.request_tile_geometry(1, 0, 5);
        assert!(!provider.raw_cache().contains("[0,0,5]"));
    }

    #[tokio::test]
    async fn test_saturated_rerequest_expires_payload() {
        let fetcher = Arc::new(MockFetcher::ok(packet(1.0)));
        let clock = Arc::new(ManualClock::new());
        let provider = provider(fetcher.clone(), Arc::new(DecodeScheduler::new(0)), clock.clone());
        let coord = TileCoord::new(0, 0, 5);

        let pending = provider.request_tile_geometry(0, 0, 5).unwrap();
        assert!(pending.resolve().await.unwrap().is_none());
        assert!(provider.raw_cache().contains("[0,0,5]"));

        // Each re-request takes the payload and puts it back.
        clock.advance(Duration::from_secs(6));
        assert!(provider.request_tile_geometry(0, 0, 5).is_none());
        assert_eq!(provider.tile_state(coord), Some(TileState::CachedRaw));
        clock.advance(Duration::from_secs(6));
        assert!(provider.request_tile_geometry(0, 0, 5).is_none());

        assert!(!provider.raw_cache().contains("[0,0,5]"));
        assert_eq!(provider.tile_state(coord), None);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_sweep_clears_evicted_cached_state() {
        let fetcher = Arc::new(MockFetcher::ok(packet(1.0)));
        let clock = Arc::new(ManualClock::new());
        let provider = provider(fetcher, Arc::new(DecodeScheduler::new(0)), clock.clone());
        let coord = TileCoord::new(0, 0, 5);

        let pending = provider.request_tile_geometry(0, 0, 5).unwrap();
        assert!(pending.resolve().await.unwrap().is_none());
        assert_eq!(provider.tile_state(coord), Some(TileState::CachedRaw));

        clock.advance(Duration::from_secs(11));
        let _ = provider.request_tile_geometry(1, 0, 5);
        assert!(!provider.raw_cache().contains("[0,0,5]"));
        assert_eq!(provider.tile_state(coord), None);
    }

    #[tokio::test]
    async fn test_sweep_retires_decoded_state() {
        let fetcher = Arc::new(MockFetcher::ok(packet(7.0)));
        let clock = Arc::new(ManualClock::new());
        let provider = provider(fetcher, Arc::new(DecodeScheduler::new(1)), clock.clone());
        let coord = TileCoord::new(2, 1, 4);

        provider.request_tile_geometry(2, 1, 4).unwrap().resolve().await.unwrap();
        assert_eq!(provider.tile_state(coord), Some(TileState::Decoded));

        clock.advance(Duration::from_secs(11));
        let pending = provider.request_tile_geometry(3, 1, 4).unwrap();
        assert_eq!(provider.tile_state(coord), None);
        assert_eq!(provider.tile_state(TileCoord::new(3, 1, 4)), Some(TileState::Fetching));
        drop(pending);
    }

    #[tokio::test]
    async fn test_fetch_failure_reports_error() {
        let fetcher = Arc::new(MockFetcher::with_response(Err(FetchError::Status {
            status: 404,
            url: "http://dem/4/0/0".to_string(),
        })));
        let provider = provider(fetcher, Arc::new(DecodeScheduler::new(1)), Arc::new(ManualClock::new()));
        let mut errors = provider.subscribe_errors();

        let result = provider.request_tile_geometry(0, 0, 4).unwrap().resolve().await;
        assert!(matches!(result, Err(ProviderError::Fetch { .. })));

        let event = errors.try_recv().unwrap();
        assert_eq!(event.message, "An error occurred while accessing http://dem/4/0/0.");
        assert_eq!(event.coord, TileCoord::new(0, 0, 4));
        assert_eq!(provider.tile_state(TileCoord::new(0, 0, 4)), None);
        assert_eq!(provider.metrics().snapshot().failures, 1);
    }

    #[test]
    fn test_geometric_error_halves_per_level() {
        let provider = provider(
            Arc::new(MockFetcher::ok(Vec::new())),
            Arc::new(DecodeScheduler::new(1)),
            Arc::new(ManualClock::new()),
        );
        let level0 = provider.level_maximum_geometric_error(0);
        let expected = crate::coord::WGS84_MAXIMUM_RADIUS * 2.0 * std::f64::consts::PI * 0.25 / (65.0 * 2.0);
        assert!((level0 - expected).abs() < 1e-9);
        assert!((provider.level_maximum_geometric_error(3) - level0 / 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_accessors() {
        let provider = provider(
            Arc::new(MockFetcher::ok(Vec::new())),
            Arc::new(DecodeScheduler::new(1)),
            Arc::new(ManualClock::new()),
        );
        assert_eq!(provider.id(), "terrain");
        assert_eq!(provider.width(), WIDTH);
        assert_eq!(provider.min_level(), 2);
        assert_eq!(provider.max_level(), 11);
        assert_eq!(provider.sources().len(), 1);
        assert_eq!(provider.rectangle(), Rectangle::MAX_VALUE);
        assert_eq!(provider.tiling_scheme().number_of_x_tiles_at_level(0), 2);
    }
}
