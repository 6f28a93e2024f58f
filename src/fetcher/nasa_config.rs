//! NASA Mars Rover Photos API configuration
//!
//! Endpoint shape:
//! `GET {base}/rovers/{rover}/photos?earth_date={yyyy-MM-dd}&api_key={key}`

use std::time::Duration;

/// Default base URL for the Mars Rover Photos API
pub const DEFAULT_BASE_URL: &str = "https://api.nasa.gov/mars-photos/api/v1";

/// Public, heavily rate-limited key used when none is configured
pub const DEMO_API_KEY: &str = "DEMO_KEY";

/// HTTP connect timeout
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout. Full-resolution images can be several MB.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// How non-success listing responses are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Any non-success status means "no photos". This conflates genuine API
    /// errors (e.g. 429 on `DEMO_KEY`) with an empty day.
    #[default]
    TreatAsEmpty,
    /// Non-success statuses are reported as [`super::FetcherError::HttpStatus`].
    Strict,
}

/// Build the photo-listing URL path (without query) for a rover
pub fn photos_endpoint(base_url: &str, rover_name: &str) -> String {
    format!("{}/rovers/{}/photos", base_url.trim_end_matches('/'), rover_name)
}

/// Pick the configured key, falling back to [`DEMO_API_KEY`] when absent or blank
pub fn effective_api_key(api_key: Option<&str>) -> String {
    match api_key.map(str::trim) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => DEMO_API_KEY.to_string(),
    }
}
