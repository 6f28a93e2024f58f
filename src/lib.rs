//! # Mars Photo Downloader Library
//!
//! Fetches photographs taken by NASA's Mars rovers from the public Mars Rover
//! Photos API and keeps them in a local, idempotent disk cache organised by
//! rover and Earth date.
//!
//! ## Features
//!
//! - **Bounded Parallelism**: Photo downloads for a date run through a pull-based
//!   worker pool with a fixed concurrency limit
//! - **Idempotent Cache**: Files already on disk are never downloaded again
//! - **No-Photos Markers**: Dates confirmed to have no photos are recorded on disk
//! - **Cooperative Cancellation**: A single signal stops listing and download work
//! - **Lenient Date Input**: Date lists in many common formats are accepted
//!
//! ## Quick Start
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
//! let source = Arc::new(NasaPhotoClient::new(None)?);
//! let cache = PhotoCache::open("./photos")?;
//! let downloader = PhotoDownloader::new(source, cache);
//!
//! let date: ObservationDate = "2017-02-27".parse()?;
//! let cancel = ShutdownCoordinator::new();
//! let summary = downloader
//!     .download_photos(&[Rover::Curiosity], &[date], &cancel)
//!     .await?;
//! println!("downloaded {} photos", summary.downloaded());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - Remote photo source (trait + NASA HTTP client + body parser)
//! - [`cache`] - On-disk cache layout, atomic writes and the read-side catalog
//! - [`downloader`] - Bounded parallel executor and the fetch orchestrator
//! - [`warmer`] - Startup cache warmer driven by a seed dates file
//! - [`dates`] - Lenient date parsing for CLI and seed files
//! - [`config`] - Runtime settings and validation
//!
//! ## Disk Layout
//!
//! ```text
//! <cache_root>/<Rover>/<yyyy-MM-dd>/<filename from URL>
//! <cache_root>/<Rover>/<yyyy-MM-dd>/NoPhotos.txt
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Read-side and write-side disk cache
pub mod cache;

/// CLI command implementations
pub mod cli;

/// Runtime configuration
pub mod config;

/// Lenient date parsing
pub mod dates;

/// Download orchestration
pub mod downloader;

/// Remote photo sources
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Cancellation coordination shared across tasks
pub mod shutdown;

/// Startup cache warmer
pub mod warmer;

pub use cache::PhotoCache;
pub use downloader::{DownloadError, PhotoDownloader};
pub use fetcher::{PhotoReference, PhotoSource};

/// Mars rover whose photos can be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rover {
    /// Mars Science Laboratory, landed 2012
    Curiosity,
    /// MER-B, landed 2004
    Opportunity,
    /// MER-A, landed 2004
    Spirit,
}

impl Rover {
    /// Every supported rover, in API order
    pub const ALL: [Rover; 3] = [Rover::Curiosity, Rover::Opportunity, Rover::Spirit];

    /// Name used in API paths and cache directories
    pub fn name(&self) -> &'static str {
        match self {
            Rover::Curiosity => "Curiosity",
            Rover::Opportunity => "Opportunity",
            Rover::Spirit => "Spirit",
        }
    }
}

impl std::fmt::Display for Rover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Rover {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "curiosity" => Ok(Rover::Curiosity),
            "opportunity" => Ok(Rover::Opportunity),
            "spirit" => Ok(Rover::Spirit),
            _ => Err(format!(
                "Invalid rover: {s}. Valid options: Curiosity, Opportunity, Spirit"
            )),
        }
    }
}

/// Earth date identifying which day's photos are requested
///
/// Always rendered as `YYYY-MM-DD`, both in API query strings and in cache
/// directory names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ObservationDate(NaiveDate);

impl ObservationDate {
    /// Canonical format used on disk and on the wire
    pub const FORMAT: &'static str = "%Y-%m-%d";

    /// Build from year, month and day, rejecting impossible calendar dates
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Underlying calendar date
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Canonical `YYYY-MM-DD` string
    pub fn as_canonical(&self) -> String {
        self.0.format(Self::FORMAT).to_string()
    }
}

impl From<NaiveDate> for ObservationDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl std::fmt::Display for ObservationDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for ObservationDate {
    type Err = String;

    /// Strict canonical parse. Use [`dates::parse_date`] for free-form input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), Self::FORMAT)
            .map(Self)
            .map_err(|e| format!("Invalid date '{s}' (expected YYYY-MM-DD): {e}"))
    }
}

impl From<ObservationDate> for String {
    fn from(date: ObservationDate) -> Self {
        date.as_canonical()
    }
}

impl TryFrom<String> for ObservationDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
