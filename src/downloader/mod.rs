//! Download orchestration
//!
//! This module drives the fetch-and-cache pipeline for rover photos.
//!
//! # Overview
//!
//! For every (rover, date) pair, in order:
//!
//! 1. **Directory**: the cache directory is created if it is missing
//! 2. **Listing**: the [`crate::fetcher::PhotoSource`] returns the image URLs
//! 3. **Filtering**: URLs whose filename is already on disk are skipped
//! 4. **Download**: the remainder goes through [`bounded::run_bounded`]
//! 5. **Marker**: an empty listing on an empty directory records `NoPhotos.txt`
//!
//! Dates are processed one at a time; only the photos inside a date run in
//! parallel.
//!
//! # Quick Start
//!
//! ```no_run
//! use mars_photo_downloader::cache::PhotoCache;
//! use mars_photo_downloader::downloader::PhotoDownloader;
//! use mars_photo_downloader::fetcher::nasa_http::NasaPhotoClient;
//! use mars_photo_downloader::shutdown::ShutdownCoordinator;
//! use mars_photo_downloader::{ObservationDate, Rover};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = PhotoDownloader::new(
//!     Arc::new(NasaPhotoClient::new(None)?),
//!     PhotoCache::open("./photos")?,
//! )
//! .with_max_concurrency(4);
//!
//! let date: ObservationDate = "2017-02-27".parse()?;
//! let report = downloader
//!     .download_date(Rover::Curiosity, date, &ShutdownCoordinator::new())
//!     .await?;
//! println!("{} new, {} already cached", report.downloaded, report.skipped);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, DownloadError>`:
//! - A listing failure aborts its date
//! - Per-photo failures are isolated; siblings still run and the date reports
//!   one [`DownloadError::BatchFailed`]
//! - Nothing is retried. Re-running is cheap because cached files are skipped
//!
//! # Related Modules
//!
//! - [`crate::fetcher`] - Remote photo sources
//! - [`crate::cache`] - On-disk layout and atomic writes

pub mod bounded;
pub mod orchestrator;

pub use bounded::{default_concurrency, run_bounded, BoundedError, BoundedSummary};
pub use orchestrator::{DateReport, DownloadSummary, PhotoDownloader};

use crate::cache::CacheError;
use crate::fetcher::FetcherError;
use crate::{ObservationDate, Rover};

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Transport failure talking to the API or an image host
    #[error("network error: {0}")]
    NetworkError(String),

    /// Non-success HTTP status
    #[error("HTTP status {status} from {url}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Requested URL, key redacted
        url: String,
    },

    /// Listing body could not be parsed
    #[error("parse error: {0}")]
    ParseError(String),

    /// Directory or file could not be written
    #[error("cache write error: {0}")]
    CacheWriteError(String),

    /// A listed URL has no usable filename
    #[error("invalid photo reference: {0}")]
    InvalidReference(String),

    /// Settings are unusable; raised before any fetch
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Cancellation was requested
    #[error("download cancelled")]
    Cancelled,

    /// Some photos of a date failed; the rest were still attempted
    #[error("{failed} photo(s) failed for {rover} on {date}: {first}")]
    BatchFailed {
        /// Rover of the failed batch
        rover: Rover,
        /// Date of the failed batch
        date: ObservationDate,
        /// Number of photos that failed
        failed: usize,
        /// First failure observed
        first: Box<DownloadError>,
    },
}

impl DownloadError {
    /// Whether this error only reports cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled)
    }
}

impl From<FetcherError> for DownloadError {
    fn from(e: FetcherError) -> Self {
        match e {
            FetcherError::NetworkError(msg) => DownloadError::NetworkError(msg),
            FetcherError::HttpStatus { status, url } => DownloadError::HttpStatus { status, url },
            FetcherError::ParseError(msg) => DownloadError::ParseError(msg),
            FetcherError::Cancelled => DownloadError::Cancelled,
        }
    }
}

impl From<CacheError> for DownloadError {
    fn from(e: CacheError) -> Self {
        DownloadError::CacheWriteError(e.to_string())
    }
}
