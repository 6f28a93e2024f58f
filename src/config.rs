//! Runtime settings
//!
//! Collected from command-line flags and environment variables, validated once
//! before any network or disk work starts.

use crate::cache::PhotoCache;
use crate::downloader::bounded::default_concurrency;
use crate::downloader::{DownloadError, PhotoDownloader};
use crate::fetcher::nasa_config::{effective_api_key, StatusPolicy, DEFAULT_BASE_URL};
use crate::fetcher::nasa_http::{build_http_client, NasaPhotoClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable holding the cache root
pub const ENV_CACHE_ROOT: &str = "MARS_PHOTOS_CACHE_ROOT";

/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "NASA_API_KEY";

/// Environment variable holding the seed dates file used by the warmer
pub const ENV_SEED_DATES: &str = "MARS_PHOTOS_SEED_DATES";

/// Highest accepted concurrency
pub const MAX_CONCURRENCY: usize = 64;

/// Settings shared by every entry point
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the photo cache
    pub cache_root: Option<PathBuf>,
    /// API key; `None` falls back to `DEMO_KEY`
    pub api_key: Option<String>,
    /// Dates file read by the cache warmer
    pub seed_dates_file: Option<PathBuf>,
    /// Downloads in flight per date
    pub max_concurrency: usize,
    /// API root URL
    pub base_url: String,
    /// Interpretation of non-success listing responses
    pub status_policy: StatusPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_root: None,
            api_key: None,
            seed_dates_file: None,
            max_concurrency: default_concurrency().min(MAX_CONCURRENCY),
            base_url: DEFAULT_BASE_URL.to_string(),
            status_policy: StatusPolicy::default(),
        }
    }
}

impl Settings {
    /// Defaults overlaid with the `MARS_PHOTOS_*` and `NASA_API_KEY` variables
    pub fn from_env() -> Self {
        let non_blank = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            cache_root: non_blank(ENV_CACHE_ROOT).map(PathBuf::from),
            api_key: non_blank(ENV_API_KEY),
            seed_dates_file: non_blank(ENV_SEED_DATES).map(PathBuf::from),
            ..Self::default()
        }
    }

    /// Check the settings before any fetch
    ///
    /// # Errors
    /// [`DownloadError::ConfigurationError`] when the cache root is missing or
    /// blank, the concurrency is outside `1..=64`, or the base URL is empty
    pub fn validate(&self) -> Result<(), DownloadError> {
        self.cache_root()?;

        if !(1..=MAX_CONCURRENCY).contains(&self.max_concurrency) {
            return Err(DownloadError::ConfigurationError(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.max_concurrency
            )));
        }

        if self.base_url.trim().is_empty() {
            return Err(DownloadError::ConfigurationError(
                "API base URL is empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Configured cache root
    pub fn cache_root(&self) -> Result<&Path, DownloadError> {
        match self.cache_root.as_deref() {
            Some(root) if !root.as_os_str().to_string_lossy().trim().is_empty() => Ok(root),
            _ => Err(DownloadError::ConfigurationError(format!(
                "no cache root configured (use --cache-root or {ENV_CACHE_ROOT})"
            ))),
        }
    }

    /// API key to send, with the `DEMO_KEY` fallback applied
    pub fn effective_api_key(&self) -> String {
        effective_api_key(self.api_key.as_deref())
    }

    /// Build the NASA client these settings describe
    pub fn build_source(&self) -> Result<NasaPhotoClient, DownloadError> {
        let client = Arc::new(build_http_client()?);
        Ok(
            NasaPhotoClient::with_client(client, self.base_url.clone(), self.api_key.clone())
                .with_status_policy(self.status_policy),
        )
    }

    /// Open the cache at the configured root
    pub fn open_cache(&self) -> Result<PhotoCache, DownloadError> {
        Ok(PhotoCache::open(self.cache_root()?)?)
    }

    /// Validate, then wire a downloader against the NASA API
    pub fn build_downloader(&self) -> Result<PhotoDownloader, DownloadError> {
        self.validate()?;
        let source = Arc::new(self.build_source()?);
        Ok(PhotoDownloader::new(source, self.open_cache()?).with_max_concurrency(self.max_concurrency))
    }
}
