use std::fmt;

/// Point-in-time copy of [`TerrainMetrics`](super::TerrainMetrics).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub empty_tiles: u64,
    pub cache_hits: u64,
    pub fetches_started: u64,
    pub fetches_throttled: u64,
    pub decode_saturations: u64,
    pub decodes_completed: u64,
    pub corrupt_tiles: u64,
    pub failures: u64,
}

impl MetricsSnapshot {
    /// Fraction of fetch attempts the network layer turned away.
    pub fn throttle_rate(&self) -> f64 {
        let attempts = self.fetches_started + self.fetches_throttled;
        if attempts == 0 {
            0.0
        } else {
            self.fetches_throttled as f64 / attempts as f64
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests ({} empty), {} cache hits, {} fetches ({} throttled), \
             {} decoded ({} saturated), {} corrupt, {} failed",
            self.requests,
            self.empty_tiles,
            self.cache_hits,
            self.fetches_started,
            self.fetches_throttled,
            self.decodes_completed,
            self.decode_saturations,
            self.corrupt_tiles,
            self.failures
        )
    }
}
