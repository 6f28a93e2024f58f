//! Startup cache warmer
//!
//! Reads a seed file of dates and fetches every rover for each of them, so a
//! freshly deployed cache already holds the photos people are likely to ask for.

use crate::dates::read_dates_file;
use crate::downloader::{DateReport, DownloadError, PhotoDownloader};
use crate::shutdown::ShutdownCoordinator;
use crate::{ObservationDate, Rover};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// What to do when one rover/date fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failure and return it
    #[default]
    Abort,
    /// Log the failure, record it in the report and move on
    SkipAndContinue,
}

/// A rover/date that failed under [`FailurePolicy::SkipAndContinue`]
#[derive(Debug, Clone, Serialize)]
pub struct WarmFailure {
    /// Rover that failed
    pub rover: Rover,
    /// Date that failed
    pub date: ObservationDate,
    /// Rendered error
    pub error: String,
}

/// Result of a warm-up run
#[derive(Debug, Clone, Default, Serialize)]
pub struct WarmReport {
    /// Dates parsed from the seed file
    pub dates_read: usize,
    /// Rover/dates that completed
    pub completed: Vec<DateReport>,
    /// Rover/dates that failed and were skipped
    pub failures: Vec<WarmFailure>,
}

impl WarmReport {
    /// Photos downloaded during the run
    pub fn downloaded(&self) -> usize {
        self.completed.iter().map(|r| r.downloaded).sum()
    }
}

/// Fills the cache from a seed dates file
pub struct CacheWarmer {
    downloader: PhotoDownloader,
    rovers: Vec<Rover>,
    policy: FailurePolicy,
}

impl CacheWarmer {
    /// Warm all rovers, aborting on the first failure
    pub fn new(downloader: PhotoDownloader) -> Self {
        Self {
            downloader,
            rovers: Rover::ALL.to_vec(),
            policy: FailurePolicy::default(),
        }
    }

    /// Set the failure policy
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Restrict the rovers to warm
    pub fn with_rovers(mut self, rovers: Vec<Rover>) -> Self {
        self.rovers = rovers;
        self
    }

    /// Read `seed_file` and download every rover for every date in it.
    ///
    /// Cancellation always stops the run, whatever the policy.
    pub async fn warm(
        &self,
        seed_file: &Path,
        cancel: &ShutdownCoordinator,
    ) -> Result<WarmReport, DownloadError> {
        let dates = read_dates_file(seed_file)
            .map_err(|e| DownloadError::ConfigurationError(e.to_string()))?;
        info!(
            seed_file = %seed_file.display(),
            dates = dates.len(),
            rovers = self.rovers.len(),
            "Warming photo cache"
        );

        self.warm_dates(&dates, cancel).await
    }

    /// Download every configured rover for each of `dates`
    pub async fn warm_dates(
        &self,
        dates: &[ObservationDate],
        cancel: &ShutdownCoordinator,
    ) -> Result<WarmReport, DownloadError> {
        let mut report = WarmReport {
            dates_read: dates.len(),
            ..WarmReport::default()
        };

        for &rover in &self.rovers {
            for &date in dates {
                match self.downloader.download_date(rover, date, cancel).await {
                    Ok(date_report) => report.completed.push(date_report),
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => match self.policy {
                        FailurePolicy::Abort => return Err(e),
                        FailurePolicy::SkipAndContinue => {
                            warn!(rover = %rover, date = %date, error = %e, "Skipping failed date");
                            report.failures.push(WarmFailure {
                                rover,
                                date,
                                error: e.to_string(),
                            });
                        }
                    },
                }
            }
        }

        info!(
            completed = report.completed.len(),
            failed = report.failures.len(),
            downloaded = report.downloaded(),
            "Cache warm-up finished"
        );
        Ok(report)
    }
}
