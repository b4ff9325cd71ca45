//! HTTP fetcher backed by reqwest.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use super::{FetchError, FetchJob, TileFetcher};

/// Default number of requests allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 6;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Tile fetcher using an async reqwest client.
///
/// The number of concurrent requests is bounded. When every request slot is
/// busy, [`fetch`](TileFetcher::fetch) returns `None` instead of waiting, and
/// the caller re-requests the tile later.
pub struct ReqwestFetcher {
    client: reqwest::Client,
    slots: Arc<Semaphore>,
}

impl ReqwestFetcher {
    /// Creates a fetcher with default timeout and request limit.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_limits(DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    /// Creates a fetcher with a custom request limit and timeout.
    pub fn with_limits(max_concurrent_requests: usize, timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            slots: Arc::new(Semaphore::new(max_concurrent_requests)),
        })
    }

    /// Request slots currently free.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

impl TileFetcher for ReqwestFetcher {
    fn fetch(&self, url: &str) -> Option<FetchJob> {
        let permit = self.slots.clone().try_acquire_owned().ok()?;
        let client = self.client.clone();
        let url = url.to_string();

        Some(Box::pin(async move {
            let _permit = permit;

            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Http(format!("Request failed: {}", e)))?;

            // Check HTTP status
            if !response.status().is_success() {
                return Err(FetchError::Status {
                    status: response.status().as_u16(),
                    url,
                });
            }

            response
                .bytes()
                .await
                .map_err(|e| FetchError::Http(format!("Failed to read response: {}", e)))
        }))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Mock fetcher recording every URL it is asked for.
    pub struct MockFetcher {
        pub response: Result<Bytes, FetchError>,
        pub throttled: AtomicBool,
        pub calls: AtomicUsize,
        pub urls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        pub fn ok(body: impl Into<Bytes>) -> Self {
            Self::with_response(Ok(body.into()))
        }

        pub fn with_response(response: Result<Bytes, FetchError>) -> Self {
            Self {
                response,
                throttled: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TileFetcher for MockFetcher {
        fn fetch(&self, url: &str) -> Option<FetchJob> {
            if self.throttled.load(Ordering::SeqCst) {
                return None;
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().push(url.to_string());
            let response = self.response.clone();
            Some(Box::pin(async move { response }))
        }
    }

    #[tokio::test]
    async fn test_mock_fetcher_success() {
        let mock = MockFetcher::ok(vec![1u8, 2, 3, 4]);
        let body = mock.fetch("http://example.com").unwrap().await.unwrap();
        assert_eq!(body.as_ref(), &[1, 2, 3, 4]);
        assert_eq!(mock.calls(), 1);
    }

    #[test]
    fn test_mock_fetcher_throttled() {
        let mock = MockFetcher::ok(vec![1u8]);
        mock.throttled.store(true, Ordering::SeqCst);
        assert!(mock.fetch("http://example.com").is_none());
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_reqwest_fetcher_throttles_when_no_slots() {
        let fetcher = ReqwestFetcher::with_limits(0, 5).unwrap();
        assert_eq!(fetcher.available_slots(), 0);
        assert!(fetcher.fetch("http://127.0.0.1:9/tile").is_none());
    }

    #[tokio::test]
    async fn test_reqwest_fetcher_slot_held_until_job_dropped() {
        let fetcher = ReqwestFetcher::with_limits(1, 5).unwrap();
        let job = fetcher.fetch("http://127.0.0.1:9/tile");
        assert!(job.is_some());
        assert!(fetcher.fetch("http://127.0.0.1:9/tile").is_none());

        drop(job);
        assert_eq!(fetcher.available_slots(), 1);
    }
}
