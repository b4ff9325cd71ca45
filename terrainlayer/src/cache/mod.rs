//! Raw payload caching between fetch and decode.
//!
//! The decode pool can refuse work when it is saturated. Rather than throwing
//! away a payload that already crossed the network, the provider parks it in
//! a [`RawBufferCache`] keyed by tile, and the next request for that tile
//! decodes it without fetching again.

mod clock;
mod raw;

pub use clock::{Clock, ManualClock, SystemClock};
pub use raw::{RawBufferCache, RawCacheEntry, RawCacheStats, TidyResult, RAW_CACHE_HORIZON};
