//! Provider telemetry.
//!
//! Lock-free atomic counters updated by the tile orchestrator, with a
//! point-in-time snapshot for display.
//!
//! # Architecture
//!
//! ```text
//! TiledTerrainProvider ─────► TerrainMetrics ─────► MetricsSnapshot ─────► CLI
//!                             (atomic counters)     (point-in-time copy)
//! ```
//!
//! # Example
//!
//! ```
//! use terrainlayer::telemetry::TerrainMetrics;
//!
//! let metrics = TerrainMetrics::new();
//! metrics.request_received();
//! metrics.cache_hit();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.requests, 1);
//! assert_eq!(snapshot.cache_hits, 1);
//! ```

mod metrics;
mod snapshot;

pub use metrics::TerrainMetrics;
pub use snapshot::MetricsSnapshot;
