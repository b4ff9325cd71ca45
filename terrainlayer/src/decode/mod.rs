//! Bounded decode scheduling.
//!
//! Decoding a terrain packet is CPU-bound, so it runs off the orchestrating
//! task on a pool with a fixed number of slots. The pool never queues: when
//! every slot is taken, [`DecodePool::schedule`] hands the request back and
//! the caller must treat that as backpressure and try again later.
//!
//! # Design
//!
//! ```text
//! schedule() ── try_acquire slot ──┬── Ok(job) ── spawn_blocking(decode_packet)
//!                                   │               (slot held until the job ends)
//!                                   └── Err(request) (saturated, nothing queued)
//! ```
//!
//! A single [`DecodeScheduler`] is meant to be shared by every provider in the
//! process, which is why saturation is routine rather than exceptional.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::codec::{decode_packet, CodecError};
use crate::coord::TileCoord;

/// Default number of concurrent decode slots.
pub const DEFAULT_DECODE_CONCURRENCY: usize = 10;

/// Errors from a scheduled decode job.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The packet itself could not be decoded.
    #[error("Decode failed for tile {coord}: {source}")]
    Codec {
        coord: TileCoord,
        #[source]
        source: CodecError,
    },

    /// The worker running the job panicked or was cancelled.
    #[error("Decode worker failed for tile {coord}: {message}")]
    Worker { coord: TileCoord, message: String },

    /// The decoder returned a grid of the wrong size.
    #[error("Decoded tile {coord} has {actual} heights, expected {expected}")]
    GridSize {
        coord: TileCoord,
        expected: usize,
        actual: usize,
    },
}

/// Input to a decode job.
///
/// The buffer is moved into the job; the scheduler keeps no reference to it.
#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub buffer: Bytes,
    pub width: usize,
    pub coord: TileCoord,
    /// Tile-matrix label the payload was fetched under.
    pub label: String,
}

/// Output of a decode job, handed back by value.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTile {
    pub heights: Vec<f32>,
    pub coord: TileCoord,
    pub label: String,
}

/// Deferred decode result.
pub type DecodeJob = BoxFuture<'static, Result<DecodedTile, DecodeError>>;

/// A bounded pool that decodes terrain packets.
pub trait DecodePool: Send + Sync {
    /// Submit a decode job.
    ///
    /// When no slot is free nothing is queued and the request is handed back
    /// as `Err`, so the caller keeps ownership of the payload. This is
    /// backpressure, not a failure.
    fn schedule(&self, request: DecodeRequest) -> Result<DecodeJob, DecodeRequest>;

    /// Total number of slots.
    fn capacity(&self) -> usize;

    /// Slots currently free.
    fn available(&self) -> usize;
}

/// Decode pool backed by a semaphore and tokio's blocking thread pool.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct DecodeScheduler {
    slots: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
}

impl DecodeScheduler {
    /// Create a scheduler with `capacity` concurrent slots.
    pub fn new(capacity: usize) -> Self {
        tracing::info!(capacity, "Created terrain decode scheduler");

        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of jobs currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}

impl Default for DecodeScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DECODE_CONCURRENCY)
    }
}

impl DecodePool for DecodeScheduler {
    fn schedule(&self, request: DecodeRequest) -> Result<DecodeJob, DecodeRequest> {
        let permit = match self.slots.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => return Err(request),
        };

        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let slot = DecodeSlot {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        };

        let coord = request.coord;
        let handle = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            run_decode(request)
        });

        Ok(Box::pin(async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(DecodeError::Worker {
                    coord,
                    message: e.to_string(),
                }),
            }
        }))
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

/// Run the codec for one request.
pub fn run_decode(request: DecodeRequest) -> Result<DecodedTile, DecodeError> {
    let DecodeRequest {
        buffer,
        width,
        coord,
        label,
    } = request;

    let heights = decode_packet(&buffer, width).map_err(|source| DecodeError::Codec { coord, source })?;
    Ok(DecodedTile {
        heights,
        coord,
        label,
    })
}

/// Held by a running job; frees the slot when dropped.
struct DecodeSlot {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for DecodeSlot {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_packet;

    fn request(width: usize, height: f32) -> DecodeRequest {
        let heights = vec![height; width * width];
        DecodeRequest {
            buffer: Bytes::from(encode_packet(&heights, width, 0.0, 0.5).unwrap()),
            width,
            coord: TileCoord::new(1, 2, 3),
            label: "3".to_string(),
        }
    }

    #[tokio::test]
    async fn test_schedule_decodes() {
        let scheduler = DecodeScheduler::new(2);
        let job = scheduler.schedule(request(5, 42.0)).unwrap();
        let tile = job.await.unwrap();

        assert_eq!(tile.coord, TileCoord::new(1, 2, 3));
        assert_eq!(tile.label, "3");
        assert_eq!(tile.heights, vec![42.0; 25]);
    }

    #[tokio::test]
    async fn test_saturated_pool_rejects_and_returns_request() {
        let scheduler = DecodeScheduler::new(0);
        let rejected = scheduler.schedule(request(3, 1.0)).err().unwrap();
        assert_eq!(rejected.coord, TileCoord::new(1, 2, 3));
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_slot_released_after_job() {
        let scheduler = DecodeScheduler::new(1);
        let job = scheduler.schedule(request(3, 1.0)).unwrap();
        assert_eq!(scheduler.available(), 0);
        assert!(scheduler.schedule(request(3, 1.0)).is_err());

        job.await.unwrap();
        assert_eq!(scheduler.available(), 1);
        assert_eq!(scheduler.in_flight(), 0);
        assert!(scheduler.schedule(request(3, 1.0)).is_ok());
    }

    #[tokio::test]
    async fn test_codec_failure_is_reported() {
        let scheduler = DecodeScheduler::new(1);
        let bad = DecodeRequest {
            buffer: Bytes::from_static(b"short"),
            width: 3,
            coord: TileCoord::new(0, 0, 1),
            label: "1".to_string(),
        };
        let err = scheduler.schedule(bad).unwrap().await.unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Codec {
                source: CodecError::Truncated { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_grid_size_error_display() {
        let err = DecodeError::GridSize {
            coord: TileCoord::new(1, 0, 2),
            expected: 9,
            actual: 3,
        };
        let message = err.to_string();
        assert!(message.contains("has 3 heights"));
        assert!(message.contains("expected 9"));
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(DecodeScheduler::default().capacity(), DEFAULT_DECODE_CONCURRENCY);
    }
}
