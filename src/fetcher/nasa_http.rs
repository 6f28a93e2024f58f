//! HTTP client for the NASA Mars Rover Photos API
//!
//! Wraps a shared [`reqwest::Client`] and provides:
//! - Photo listing per rover and Earth date
//! - Raw image downloads
//! - Cancellation at every await point via [`ShutdownCoordinator`]
//!
//! Requests are not retried here. A failed listing or download surfaces to the
//! caller, which can simply re-run: the disk cache makes that idempotent.

use async_trait::async_trait;
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::fetcher::nasa_config::{
    effective_api_key, photos_endpoint, StatusPolicy, DEFAULT_BASE_URL, HTTP_CONNECT_TIMEOUT,
    HTTP_REQUEST_TIMEOUT,
};
use crate::fetcher::nasa_parser::NasaParser;
use crate::fetcher::{FetcherError, FetcherResult, PhotoSource};
use crate::metrics::HttpRequestMetrics;
use crate::shutdown::ShutdownCoordinator;
use crate::{ObservationDate, Rover};

/// Build the HTTP client used for both listings and image downloads
pub fn build_http_client() -> FetcherResult<Client> {
    Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| FetcherError::NetworkError(format!("Failed to build HTTP client: {e}")))
}

/// Client for the Mars Rover Photos API
pub struct NasaPhotoClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    status_policy: StatusPolicy,
}

impl NasaPhotoClient {
    /// Create a client against the public API.
    ///
    /// # Arguments
    /// * `api_key` - API key; `None` or blank falls back to `DEMO_KEY`
    pub fn new(api_key: Option<String>) -> FetcherResult<Self> {
        let client = Arc::new(build_http_client()?);
        Ok(Self::with_client(client, DEFAULT_BASE_URL, api_key))
    }

    /// Create a client with an explicit HTTP client and base URL
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client (Arc for cheap cloning)
    /// * `base_url` - API root, e.g. `https://api.nasa.gov/mars-photos/api/v1`
    /// * `api_key` - API key; `None` or blank falls back to `DEMO_KEY`
    pub fn with_client(
        client: Arc<Client>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: effective_api_key(api_key.as_deref()),
            status_policy: StatusPolicy::default(),
        }
    }

    /// Choose how non-success listing responses are interpreted
    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the public demo key is in use
    pub fn uses_demo_key(&self) -> bool {
        self.api_key == crate::fetcher::nasa_config::DEMO_API_KEY
    }

    /// Listing URL with the key left out, for logs and error messages
    fn redacted_listing_url(&self, rover: Rover, date: ObservationDate) -> String {
        format!(
            "{}?earth_date={}&api_key=***",
            photos_endpoint(&self.base_url, rover.name()),
            date
        )
    }
}

/// Await `fut` unless `cancel` fires first
async fn cancellable<F, T>(fut: F, cancel: &ShutdownCoordinator) -> FetcherResult<T>
where
    F: Future<Output = FetcherResult<T>>,
{
    if cancel.is_shutdown_requested() {
        return Err(FetcherError::Cancelled);
    }
    tokio::select! {
        result = fut => result,
        _ = cancel.wait_for_shutdown() => Err(FetcherError::Cancelled),
    }
}

fn network_error(e: reqwest::Error) -> FetcherError {
    // Drop the URL so the API key never ends up in logs.
    FetcherError::NetworkError(e.without_url().to_string())
}

#[async_trait]
impl PhotoSource for NasaPhotoClient {
    async fn fetch_photo_urls(
        &self,
        rover: Rover,
        date: ObservationDate,
        cancel: &ShutdownCoordinator,
    ) -> FetcherResult<Vec<String>> {
        let url = photos_endpoint(&self.base_url, rover.name());
        let display_url = self.redacted_listing_url(rover, date);
        let params = [
            ("earth_date", date.as_canonical()),
            ("api_key", self.api_key.clone()),
        ];

        debug!(url = %display_url, "Requesting photo listing");
        let metrics = HttpRequestMetrics::start("listing");

        let response = cancellable(
            async {
                self.client
                    .get(&url)
                    .query(&params)
                    .send()
                    .await
                    .map_err(network_error)
            },
            cancel,
        )
        .await
        .inspect_err(|e| {
            if !matches!(e, FetcherError::Cancelled) {
                metrics.record_network_error();
            }
        })?;

        let status = response.status();
        metrics.record_complete(status.as_u16());

        if !status.is_success() {
            warn!(
                url = %display_url,
                status = status.as_u16(),
                policy = ?self.status_policy,
                "Photo listing returned non-success status"
            );
            // The body of a failed listing is never read.
            if cancel.is_shutdown_requested() {
                return Err(FetcherError::Cancelled);
            }
            return NasaParser::urls_from_response(
                status.as_u16(),
                "",
                self.status_policy,
                &display_url,
            );
        }

        let body = cancellable(
            async { response.text().await.map_err(network_error) },
            cancel,
        )
        .await?;

        if cancel.is_shutdown_requested() {
            return Err(FetcherError::Cancelled);
        }

        let urls =
            NasaParser::urls_from_response(status.as_u16(), &body, self.status_policy, &display_url)?;
        debug!(url = %display_url, count = urls.len(), "Photo listing parsed");
        Ok(urls)
    }

    async fn download_photo(
        &self,
        url: &str,
        cancel: &ShutdownCoordinator,
    ) -> FetcherResult<Vec<u8>> {
        let metrics = HttpRequestMetrics::start("photo");

        let response = cancellable(
            async { self.client.get(url).send().await.map_err(network_error) },
            cancel,
        )
        .await
        .inspect_err(|e| {
            if !matches!(e, FetcherError::Cancelled) {
                metrics.record_network_error();
            }
        })?;

        let status = response.status();
        metrics.record_complete(status.as_u16());
        if !status.is_success() {
            return Err(FetcherError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = cancellable(
            async { response.bytes().await.map_err(network_error) },
            cancel,
        )
        .await?;

        Ok(bytes.to_vec())
    }
}
