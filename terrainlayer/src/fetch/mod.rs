//! Network fetch abstraction for terrain payloads.
//!
//! The provider depends on the [`TileFetcher`] trait rather than on an HTTP
//! library directly, which allows mock fetchers in tests and alternative
//! transports in embedders.

mod http;

pub use http::{ReqwestFetcher, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_REQUEST_TIMEOUT_SECS};

#[cfg(test)]
pub use http::tests::MockFetcher;

use bytes::Bytes;
use futures::future::BoxFuture;
use thiserror::Error;

/// Errors fetching a terrain payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

/// Deferred fetch result.
pub type FetchJob = BoxFuture<'static, Result<Bytes, FetchError>>;

/// Fetches raw terrain payloads.
pub trait TileFetcher: Send + Sync {
    /// Start fetching `url`.
    ///
    /// Returns `None` when the transport is throttled and cannot take another
    /// request right now. Nothing is queued in that case.
    fn fetch(&self, url: &str) -> Option<FetchJob>;
}
