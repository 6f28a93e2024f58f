//! Photo fetch orchestrator
//!
//! Ties a [`PhotoSource`] to a [`PhotoCache`] and walks (rover, date) pairs one
//! date at a time.

use crate::cache::PhotoCache;
use crate::downloader::bounded::{default_concurrency, run_bounded, BoundedError};
use crate::downloader::DownloadError;
use crate::fetcher::{PhotoReference, PhotoSource};
use crate::metrics::{record_no_photos_marker, record_photo_written, record_photos_skipped, BatchMetrics};
use crate::shutdown::ShutdownCoordinator;
use crate::{ObservationDate, Rover};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Outcome of one rover/date batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateReport {
    /// Rover that was fetched
    pub rover: Rover,
    /// Date that was fetched
    pub date: ObservationDate,
    /// Distinct URLs returned by the listing
    pub listed: usize,
    /// Photos already on disk
    pub skipped: usize,
    /// Photos downloaded in this run
    pub downloaded: usize,
    /// Whether the date is recorded as having no photos
    pub no_photos: bool,
}

/// Outcome of a multi-date run
#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadSummary {
    /// One report per completed rover/date, in processing order
    pub dates: Vec<DateReport>,
}

impl DownloadSummary {
    /// Photos downloaded across all dates
    pub fn downloaded(&self) -> usize {
        self.dates.iter().map(|d| d.downloaded).sum()
    }

    /// Photos skipped because they were already cached
    pub fn skipped(&self) -> usize {
        self.dates.iter().map(|d| d.skipped).sum()
    }

    /// Dates recorded as having no photos
    pub fn no_photo_dates(&self) -> usize {
        self.dates.iter().filter(|d| d.no_photos).count()
    }
}

/// Fetches photos from a source into the disk cache
pub struct PhotoDownloader {
    source: Arc<dyn PhotoSource>,
    cache: PhotoCache,
    max_concurrency: usize,
}

impl PhotoDownloader {
    /// Create a downloader using one worker per available core
    pub fn new(source: Arc<dyn PhotoSource>, cache: PhotoCache) -> Self {
        Self {
            source,
            cache,
            max_concurrency: default_concurrency(),
        }
    }

    /// Set the per-date download concurrency. 0 behaves as 1.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Per-date download concurrency
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Cache this downloader writes into
    pub fn cache(&self) -> &PhotoCache {
        &self.cache
    }

    /// Fetch every (rover, date) pair: rovers outer, dates inner.
    ///
    /// Dates run strictly one after another and the first failing date stops
    /// the run. Use [`Self::download_date`] directly for a different policy.
    pub async fn download_photos(
        &self,
        rovers: &[Rover],
        dates: &[ObservationDate],
        cancel: &ShutdownCoordinator,
    ) -> Result<DownloadSummary, DownloadError> {
        let mut summary = DownloadSummary::default();

        for &rover in rovers {
            for &date in dates {
                let report = self.download_date(rover, date, cancel).await?;
                summary.dates.push(report);
            }
        }

        info!(
            dates = summary.dates.len(),
            downloaded = summary.downloaded(),
            skipped = summary.skipped(),
            "Photo download run completed"
        );
        Ok(summary)
    }

    /// Fetch one rover/date pair into the cache
    pub async fn download_date(
        &self,
        rover: Rover,
        date: ObservationDate,
        cancel: &ShutdownCoordinator,
    ) -> Result<DateReport, DownloadError> {
        let span = tracing::info_span!("download_date", rover = %rover, date = %date);

        async {
            if cancel.is_shutdown_requested() {
                return Err(DownloadError::Cancelled);
            }

            let batch_metrics = BatchMetrics::start(rover, date);
            let result = self.process_date(rover, date, cancel).await;
            match &result {
                Ok(report) => batch_metrics.record_success(report.downloaded, report.skipped),
                Err(e) if e.is_cancelled() => info!("Date batch cancelled"),
                Err(e) => batch_metrics.record_failure(&e.to_string()),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn process_date(
        &self,
        rover: Rover,
        date: ObservationDate,
        cancel: &ShutdownCoordinator,
    ) -> Result<DateReport, DownloadError> {
        self.cache.ensure_directory(rover, date).await?;

        let urls = self.source.fetch_photo_urls(rover, date, cancel).await?;
        let listed = urls.len();
        debug!(listed, "Photo listing received");

        let already_cached: HashSet<String> = self
            .cache
            .run_blocking(move |cache| {
                if listed > 0 {
                    cache.clear_no_photos_marker(rover, date)?;
                }
                Ok(cache.list_cached_files(rover, date)?.into_iter().collect())
            })
            .await?;

        let mut pending = Vec::new();
        let mut invalid = Vec::new();
        let mut seen_filenames = HashSet::new();
        let mut skipped = 0usize;

        for url in urls {
            let reference = match PhotoReference::from_url(url) {
                Ok(reference) => reference,
                Err(msg) => {
                    warn!(error = %msg, "Skipping unusable photo URL");
                    invalid.push(msg);
                    continue;
                }
            };

            if !seen_filenames.insert(reference.filename.clone()) {
                debug!(url = %reference.url, "Another URL maps to the same filename");
                continue;
            }

            if already_cached.contains(&reference.filename) {
                skipped += 1;
            } else {
                pending.push(reference);
            }
        }
        record_photos_skipped(rover, skipped);

        let attempted = pending.len();
        let outcome = run_bounded(pending, self.max_concurrency, cancel, move |reference| {
            self.fetch_one(rover, date, reference, cancel)
        })
        .await;

        let mut failed = invalid.len();
        let mut first_failure = invalid.into_iter().next().map(DownloadError::InvalidReference);

        let downloaded = match outcome {
            Ok(summary) => summary.completed,
            Err(BoundedError::Cancelled { completed }) => {
                info!(completed, attempted, "Download cancelled, finished photos kept");
                return Err(DownloadError::Cancelled);
            }
            Err(BoundedError::Failed {
                first,
                failed: batch_failed,
                completed,
            }) => {
                failed += batch_failed;
                first_failure.get_or_insert(first);
                completed
            }
        };

        if let Some(first) = first_failure {
            return Err(DownloadError::BatchFailed {
                rover,
                date,
                failed,
                first: Box::new(first),
            });
        }

        let mut no_photos = false;
        if listed == 0 {
            let (written, present) = self
                .cache
                .run_blocking(move |cache| {
                    let written = cache.mark_no_photos_available(rover, date)?;
                    Ok((written, cache.has_no_photos_marker(rover, date)))
                })
                .await?;
            if written {
                record_no_photos_marker(rover);
            }
            no_photos = present;
        }

        Ok(DateReport {
            rover,
            date,
            listed,
            skipped,
            downloaded,
            no_photos,
        })
    }

    async fn fetch_one(
        &self,
        rover: Rover,
        date: ObservationDate,
        reference: PhotoReference,
        cancel: &ShutdownCoordinator,
    ) -> Result<(), DownloadError> {
        let bytes = self
            .source
            .download_photo(&reference.url, cancel)
            .await
            .inspect_err(|e| {
                if !matches!(e, crate::fetcher::FetcherError::Cancelled) {
                    warn!(url = %reference.url, error = %e, "Photo download failed");
                }
            })?;

        let size = bytes.len();
        self.cache
            .write_photo(rover, date, &reference.filename, bytes)
            .await?;

        record_photo_written(rover, size);
        debug!(filename = %reference.filename, bytes = size, "Photo cached");
        Ok(())
    }
}
