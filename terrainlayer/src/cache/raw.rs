//! Short-lived cache of fetched but undecoded terrain payloads.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::clock::{Clock, SystemClock};

/// Age after which an entry is evicted, and minimum spacing between sweeps.
pub const RAW_CACHE_HORIZON: Duration = Duration::from_secs(10);

/// A cached payload and the instant it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCacheEntry {
    pub buffer: Bytes,
    pub created_at: Instant,
}

/// Result of a cache sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TidyResult {
    /// Number of entries evicted.
    pub entries_removed: usize,
    /// Total payload bytes released.
    pub bytes_freed: u64,
}

impl fmt::Display for TidyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tidy: removed {} entries, freed {} bytes",
            self.entries_removed, self.bytes_freed
        )
    }
}

/// Counters for a [`RawBufferCache`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entry_count: usize,
}

/// Holding area for payloads that could not be decoded yet.
///
/// When the decode pool is saturated the fetched payload lands here so the
/// next request for the same tile skips the network. Entries are consumed by
/// the first [`get`](Self::get) and otherwise expire after
/// [`RAW_CACHE_HORIZON`].
///
/// Eviction only happens inside [`tidy`](Self::tidy), which sweeps at most
/// once per horizon. An entry therefore lives at most two horizons provided
/// `tidy` keeps being called. There is no capacity bound.
pub struct RawBufferCache {
    entries: DashMap<String, RawCacheEntry>,
    clock: Arc<dyn Clock>,
    horizon: Duration,
    last_tidy: Mutex<Instant>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl RawBufferCache {
    /// Create a cache driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a cache driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            entries: DashMap::new(),
            clock,
            horizon: RAW_CACHE_HORIZON,
            last_tidy: Mutex::new(now),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Store a payload, replacing any previous payload for `key`.
    pub fn add(&self, key: impl Into<String>, buffer: Bytes) {
        let entry = RawCacheEntry {
            buffer,
            created_at: self.clock.now(),
        };
        self.entries.insert(key.into(), entry);
    }

    /// Put an entry back without refreshing its timestamp.
    ///
    /// Used when a consumed entry could not be handed to a decoder after all;
    /// the original creation instant still bounds its lifetime. An entry
    /// already past the horizon is dropped and counted as an eviction.
    ///
    /// Returns whether the entry was put back.
    pub fn restore(&self, key: impl Into<String>, entry: RawCacheEntry) -> bool {
        let age = self.clock.now().saturating_duration_since(entry.created_at);
        if age > self.horizon {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.entries.insert(key.into(), entry);
        true
    }

    /// Remove and return the payload for `key`.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.take(key).map(|entry| entry.buffer)
    }

    /// Remove and return the full entry for `key`.
    pub fn take(&self, key: &str) -> Option<RawCacheEntry> {
        match self.entries.remove(key) {
            Some((_, entry)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Check if a key is cached without consuming it.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached payloads.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict expired entries if a sweep is due.
    ///
    /// Returns `None` when the previous sweep was within the horizon.
    pub fn tidy(&self) -> Option<TidyResult> {
        let now = self.clock.now();
        {
            let mut last_tidy = self.last_tidy.lock();
            if now.saturating_duration_since(*last_tidy) <= self.horizon {
                return None;
            }
            *last_tidy = now;
        }

        let mut result = TidyResult::default();
        self.entries.retain(|_, entry| {
            let expired = now.saturating_duration_since(entry.created_at) > self.horizon;
            if expired {
                result.entries_removed += 1;
                result.bytes_freed += entry.buffer.len() as u64;
            }
            !expired
        });

        self.evictions
            .fetch_add(result.entries_removed as u64, Ordering::Relaxed);
        if result.entries_removed > 0 {
            tracing::debug!(
                removed = result.entries_removed,
                bytes = result.bytes_freed,
                "Raw terrain cache sweep"
            );
        }

        Some(result)
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> RawCacheStats {
        RawCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count: self.entries.len(),
        }
    }
}

impl Default for RawBufferCache {
    fn default() -> Self {
        Self::new()
    }
}
