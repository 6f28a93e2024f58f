//! Remote photo sources

use crate::cache::{NO_PHOTOS_MARKER, TEMP_PREFIX};
use crate::shutdown::ShutdownCoordinator;
use crate::{ObservationDate, Rover};
use async_trait::async_trait;

pub mod nasa_config;
pub mod nasa_http;
pub mod nasa_parser;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Transport-level failure (DNS, connect, timeout, reset)
    #[error("network error: {0}")]
    NetworkError(String),

    /// Non-success HTTP status where one is not tolerated
    #[error("HTTP status {status} from {url}")]
    HttpStatus {
        /// Status code returned by the server
        status: u16,
        /// Requested URL, with the API key redacted
        url: String,
    },

    /// Response body could not be parsed
    #[error("parse error: {0}")]
    ParseError(String),

    /// Cancellation was observed before the operation completed
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// A remote photo URL paired with the local filename it is cached under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoReference {
    /// Remote image URL
    pub url: String,
    /// Final path segment of the URL
    pub filename: String,
}

impl PhotoReference {
    /// Derive a reference from a URL.
    ///
    /// The filename is the text after the last `/`. The remote API is trusted to
    /// hand out sane names; only values that would escape or alias the cache
    /// directory, or that collide with the cache's own bookkeeping files, are
    /// refused.
    pub fn from_url(url: impl Into<String>) -> Result<Self, String> {
        let url = url.into();
        let filename = match url.rfind('/') {
            Some(idx) => &url[idx + 1..],
            None => url.as_str(),
        };

        if filename.is_empty() || filename == "." || filename == ".." || filename.contains('\\')
        {
            return Err(format!("cannot derive a filename from URL '{url}'"));
        }
        if filename == NO_PHOTOS_MARKER || filename.starts_with(TEMP_PREFIX) {
            return Err(format!("URL '{url}' maps to reserved cache name '{filename}'"));
        }

        let filename = filename.to_string();
        Ok(Self { url, filename })
    }
}

/// Source of rover photo listings and photo bytes
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// List the image URLs available for a rover on a date.
    ///
    /// The result is deduplicated by exact string equality. An empty vector
    /// means "no photos" (which, depending on the status policy, may also cover
    /// a non-success response from the remote API).
    ///
    /// Fails with [`FetcherError::Cancelled`] if `cancel` fires while waiting,
    /// never with a partial list.
    async fn fetch_photo_urls(
        &self,
        rover: Rover,
        date: ObservationDate,
        cancel: &ShutdownCoordinator,
    ) -> FetcherResult<Vec<String>>;

    /// Download the raw bytes behind one photo URL.
    async fn download_photo(&self, url: &str, cancel: &ShutdownCoordinator)
        -> FetcherResult<Vec<u8>>;
}
