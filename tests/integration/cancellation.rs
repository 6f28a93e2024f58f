//! Cooperative cancellation of bounded runs and date batches

use crate::support::{date, FakeSource};
use mars_photo_downloader::cache::{CacheState, TEMP_PREFIX};
use mars_photo_downloader::downloader::{run_bounded, BoundedError};
use mars_photo_downloader::shutdown::ShutdownCoordinator;
use mars_photo_downloader::{PhotoCache, PhotoDownloader, Rover};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn cancel_after_first_completion_stops_new_work() {
    let cancel = ShutdownCoordinator::new();
    let started = AtomicUsize::new(0);

    let err = run_bounded(0..100, 4, &cancel, |_| {
        let cancel = &cancel;
        let started = &started;
        async move {
            started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.request_shutdown();
            Ok::<(), String>(())
        }
    })
    .await
    .unwrap_err();

    match err {
        BoundedError::Cancelled { completed } => {
            assert!(completed >= 1);
            assert!(completed <= 4, "completed {completed} after cancellation");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(started.load(Ordering::SeqCst) <= 4);
}

#[tokio::test]
async fn cancelled_batch_keeps_finished_photos_only() {
    let day = date(2017, 2, 27);
    let urls: Vec<String> = (0..100).map(|i| format!("https://img/{i:03}.jpg")).collect();
    let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();

    let cancel = ShutdownCoordinator::shared();
    let temp_dir = TempDir::new().unwrap();
    let cache = PhotoCache::open(temp_dir.path()).unwrap();
    let source = Arc::new(
        FakeSource::new()
            .with_listing(Rover::Curiosity, day, &url_refs)
            .with_delay(Duration::from_millis(20))
            .cancel_after(1, cancel.clone()),
    );
    let downloader = PhotoDownloader::new(source.clone(), cache.clone()).with_max_concurrency(4);

    let err = downloader
        .download_photos(&[Rover::Curiosity], &[day], &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(source.downloads() <= 8, "downloads started: {}", source.downloads());

    let files = cache.list_cached_files(Rover::Curiosity, day).unwrap();
    assert!(!files.is_empty() && files.len() <= 4, "files kept: {files:?}");
    assert!(!cache.has_no_photos_marker(Rover::Curiosity, day));

    let leftovers = std::fs::read_dir(cache.resolve_directory(Rover::Curiosity, day))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(TEMP_PREFIX))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn resumed_run_completes_the_rest() {
    let day = date(2017, 3, 1);
    let urls: Vec<String> = (0..12).map(|i| format!("https://img/{i:02}.jpg")).collect();
    let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();

    let temp_dir = TempDir::new().unwrap();
    let cache = PhotoCache::open(temp_dir.path()).unwrap();

    let cancel = ShutdownCoordinator::shared();
    let interrupted = Arc::new(
        FakeSource::new()
            .with_listing(Rover::Spirit, day, &url_refs)
            .with_delay(Duration::from_millis(5))
            .cancel_after(2, cancel.clone()),
    );
    let downloader = PhotoDownloader::new(interrupted, cache.clone()).with_max_concurrency(2);
    assert!(downloader
        .download_date(Rover::Spirit, day, &cancel)
        .await
        .unwrap_err()
        .is_cancelled());
    let kept = cache.list_cached_files(Rover::Spirit, day).unwrap().len();

    let resumed = Arc::new(FakeSource::new().with_listing(Rover::Spirit, day, &url_refs));
    let downloader = PhotoDownloader::new(resumed.clone(), cache.clone()).with_max_concurrency(2);
    let report = downloader
        .download_date(Rover::Spirit, day, &ShutdownCoordinator::new())
        .await
        .unwrap();

    assert_eq!(report.skipped, kept);
    assert_eq!(report.downloaded, 12 - kept);
    assert_eq!(resumed.downloads(), 12 - kept);
    assert_eq!(cache.state(Rover::Spirit, day).unwrap(), CacheState::Cached { files: 12 });
}

#[tokio::test]
async fn cancelled_before_listing_touches_nothing() {
    let day = date(2017, 2, 27);
    let temp_dir = TempDir::new().unwrap();
    let cache = PhotoCache::open(temp_dir.path()).unwrap();
    let source = Arc::new(FakeSource::new().with_listing(Rover::Curiosity, day, &["https://img/a.jpg"]));
    let downloader = PhotoDownloader::new(source.clone(), cache.clone());

    let cancel = ShutdownCoordinator::new();
    cancel.request_shutdown();
    let err = downloader
        .download_date(Rover::Curiosity, day, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(source.listings(), 0);
    assert_eq!(cache.state(Rover::Curiosity, day).unwrap(), CacheState::NotQueried);
}
