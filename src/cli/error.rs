//! CLI error types and conversions

use crate::cache::CacheError;
use crate::dates::DatesError;
use crate::downloader::DownloadError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Download error
    #[error("download error: {0}")]
    DownloadError(#[from] DownloadError),

    /// Cache error
    #[error("cache error: {0}")]
    CacheError(#[from] CacheError),

    /// Dates file error
    #[error("{0}")]
    DatesError(#[from] DatesError),

    /// Output could not be serialized
    #[error("output error: {0}")]
    OutputError(#[from] serde_json::Error),

    /// Invalid argument
    #[error("{0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl CliError {
    /// Whether the command stopped because cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CliError::DownloadError(e) if e.is_cancelled())
    }

    /// Process exit code for this error: 130 on cancellation, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.is_cancelled() {
            130
        } else {
            1
        }
    }
}
