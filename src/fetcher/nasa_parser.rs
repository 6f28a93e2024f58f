//! Mars Rover Photos response parser
//!
//! Stateless helpers that turn the listing endpoint's response into a list of
//! image URLs. Kept free of I/O so the status and body rules can be tested
//! without a server.

use crate::fetcher::nasa_config::StatusPolicy;
use crate::fetcher::{FetcherError, FetcherResult};
use serde_json::Value;
use std::collections::HashSet;

/// Stateless parser for Mars Rover Photos API responses
pub struct NasaParser;

impl NasaParser {
    /// Extract the deduplicated `img_src` values from a listing body.
    ///
    /// Expected format: `{"photos": [{"img_src": "..."}, ...]}`. Entries without a
    /// string `img_src` contribute `""`. Order of first appearance is kept.
    ///
    /// # Errors
    /// Returns FetcherError::ParseError if the body is not JSON or has no
    /// `photos` array
    pub fn parse_photo_urls(body: &str) -> FetcherResult<Vec<String>> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| FetcherError::ParseError(format!("Invalid listing JSON: {e}")))?;

        let photos = value
            .get("photos")
            .and_then(Value::as_array)
            .ok_or_else(|| FetcherError::ParseError("Missing 'photos' array".to_string()))?;

        let urls = photos.iter().map(|photo| {
            photo
                .get("img_src")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        });

        Ok(dedup_preserving_order(urls))
    }

    /// Interpret a listing response given its status code and body.
    ///
    /// With [`StatusPolicy::TreatAsEmpty`] a non-success status yields an empty
    /// list and the body is ignored.
    pub fn urls_from_response(
        status: u16,
        body: &str,
        policy: StatusPolicy,
        url: &str,
    ) -> FetcherResult<Vec<String>> {
        if !(200..300).contains(&status) {
            return match policy {
                StatusPolicy::TreatAsEmpty => Ok(Vec::new()),
                StatusPolicy::Strict => Err(FetcherError::HttpStatus {
                    status,
                    url: url.to_string(),
                }),
            };
        }

        Self::parse_photo_urls(body)
    }
}

/// Remove exact duplicates, keeping the first occurrence of each value
pub fn dedup_preserving_order<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
