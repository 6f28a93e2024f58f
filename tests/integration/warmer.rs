//! Startup cache warmer driven by a seed dates file

use crate::support::{date, FakeSource};
use mars_photo_downloader::shutdown::ShutdownCoordinator;
use mars_photo_downloader::warmer::{CacheWarmer, FailurePolicy};
use mars_photo_downloader::{DownloadError, PhotoCache, PhotoDownloader, Rover};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn seed_file(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("seed-dates.txt");
    std::fs::write(&path, contents).unwrap();
    path
}

fn warmer(source: FakeSource, root: &TempDir) -> (Arc<FakeSource>, PhotoCache, CacheWarmer) {
    let cache = PhotoCache::open(root.path().join("photos")).unwrap();
    let source = Arc::new(source);
    let downloader = PhotoDownloader::new(source.clone(), cache.clone()).with_max_concurrency(2);
    (source, cache, CacheWarmer::new(downloader))
}

#[tokio::test]
async fn warms_every_rover_for_every_seed_date() {
    let tmp = TempDir::new().unwrap();
    let seed = seed_file(&tmp, "02/27/17\r\nJune 2, 2018\rnot a date\n\nJul-13-2016\nApril 31, 2018\n");
    let source = FakeSource::new().with_listing(Rover::Curiosity, date(2017, 2, 27), &["https://img/a.jpg"]);
    let (source, cache, warmer) = warmer(source, &tmp);

    let report = warmer.warm(&seed, &ShutdownCoordinator::new()).await.unwrap();

    assert_eq!(report.dates_read, 3);
    assert_eq!(report.completed.len(), 9);
    assert!(report.failures.is_empty());
    assert_eq!(report.downloaded(), 1);
    assert_eq!(source.listings(), 9);
    assert!(cache.is_already_cached(Rover::Curiosity, date(2017, 2, 27), "a.jpg"));
    assert!(cache.has_no_photos_marker(Rover::Spirit, date(2016, 7, 13)));
}

#[tokio::test]
async fn abort_policy_stops_at_first_failure() {
    let tmp = TempDir::new().unwrap();
    let seed = seed_file(&tmp, "2017-02-27\n2017-02-28\n");
    let source = FakeSource::new().with_failing_listing(Rover::Curiosity, date(2017, 2, 27));
    let (source, _cache, warmer) = warmer(source, &tmp);

    let err = warmer.warm(&seed, &ShutdownCoordinator::new()).await.unwrap_err();

    assert!(matches!(err, DownloadError::NetworkError(_)));
    assert_eq!(source.listings(), 1);
}

#[tokio::test]
async fn skip_policy_records_failures_and_continues() {
    let tmp = TempDir::new().unwrap();
    let seed = seed_file(&tmp, "2017-02-27\n2017-02-28\n");
    let source = FakeSource::new().with_failing_listing(Rover::Opportunity, date(2017, 2, 28));
    let (source, _cache, warmer) = warmer(source, &tmp);
    let warmer = warmer.with_policy(FailurePolicy::SkipAndContinue);

    let report = warmer.warm(&seed, &ShutdownCoordinator::new()).await.unwrap();

    assert_eq!(source.listings(), 6);
    assert_eq!(report.completed.len(), 5);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].rover, Rover::Opportunity);
    assert_eq!(report.failures[0].date, date(2017, 2, 28));
}

#[tokio::test]
async fn cancellation_aborts_even_when_skipping() {
    let tmp = TempDir::new().unwrap();
    let seed = seed_file(&tmp, "2017-02-27\n");
    let (source, _cache, warmer) = warmer(FakeSource::new(), &tmp);
    let warmer = warmer.with_policy(FailurePolicy::SkipAndContinue);

    let cancel = ShutdownCoordinator::new();
    cancel.request_shutdown();
    let err = warmer.warm(&seed, &cancel).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(source.listings(), 0);
}

#[tokio::test]
async fn unreadable_seed_file_is_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let (_source, _cache, warmer) = warmer(FakeSource::new(), &tmp);

    let err = warmer
        .warm(&tmp.path().join("missing.txt"), &ShutdownCoordinator::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::ConfigurationError(_)));
    assert!(err.to_string().contains("Unable to process the file"));
}
