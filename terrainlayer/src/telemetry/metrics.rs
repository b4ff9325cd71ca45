use std::sync::atomic::{AtomicU64, Ordering};

use super::MetricsSnapshot;

/// Counters for one terrain provider.
///
/// All updates use relaxed atomics; a snapshot is not a consistent cut across
/// counters, which is fine for reporting.
#[derive(Debug, Default)]
pub struct TerrainMetrics {
    requests: AtomicU64,
    empty_tiles: AtomicU64,
    cache_hits: AtomicU64,
    fetches_started: AtomicU64,
    fetches_throttled: AtomicU64,
    decode_saturations: AtomicU64,
    decodes_completed: AtomicU64,
    corrupt_tiles: AtomicU64,
    failures: AtomicU64,
}

impl TerrainMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tile geometry request arrived.
    pub fn request_received(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// A zero grid was returned without touching the network.
    pub fn empty_tile(&self) {
        self.empty_tiles.fetch_add(1, Ordering::Relaxed);
    }

    /// A raw payload was served from the cache.
    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_started(&self) {
        self.fetches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_throttled(&self) {
        self.fetches_throttled.fetch_add(1, Ordering::Relaxed);
    }

    /// The decode pool had no free slot.
    pub fn decode_saturated(&self) {
        self.decode_saturations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_completed(&self) {
        self.decodes_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// A decoded tile started with NaN and was replaced by a zero grid.
    pub fn corrupt_tile(&self) {
        self.corrupt_tiles.fetch_add(1, Ordering::Relaxed);
    }

    /// A fetch or decode failed.
    pub fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            empty_tiles: self.empty_tiles.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            fetches_started: self.fetches_started.load(Ordering::Relaxed),
            fetches_throttled: self.fetches_throttled.load(Ordering::Relaxed),
            decode_saturations: self.decode_saturations.load(Ordering::Relaxed),
            decodes_completed: self.decodes_completed.load(Ordering::Relaxed),
            corrupt_tiles: self.corrupt_tiles.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_metrics_are_zero() {
        assert_eq!(TerrainMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_are_independent() {
        let metrics = TerrainMetrics::new();
        metrics.request_received();
        metrics.request_received();
        metrics.fetch_started();
        metrics.decode_saturated();
        metrics.failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.fetches_started, 1);
        assert_eq!(snapshot.decode_saturations, 1);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.cache_hits, 0);
        assert_eq!(snapshot.corrupt_tiles, 0);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Arc::new(TerrainMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.request_received();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.snapshot().requests, 4000);
    }
}
