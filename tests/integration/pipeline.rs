//! End-to-end fetch-and-cache behaviour against an in-memory source

use crate::support::{body_for, date, FakeSource};
use mars_photo_downloader::cache::{CacheState, NO_PHOTOS_MARKER};
use mars_photo_downloader::shutdown::ShutdownCoordinator;
use mars_photo_downloader::{DownloadError, PhotoCache, PhotoDownloader, Rover};
use std::sync::Arc;
use tempfile::TempDir;

fn setup(source: FakeSource) -> (TempDir, PhotoCache, Arc<FakeSource>, PhotoDownloader) {
    let temp_dir = TempDir::new().unwrap();
    let cache = PhotoCache::open(temp_dir.path()).unwrap();
    let source = Arc::new(source);
    let downloader = PhotoDownloader::new(source.clone(), cache.clone()).with_max_concurrency(4);
    (temp_dir, cache, source, downloader)
}

fn entries(cache: &PhotoCache, rover: Rover, d: mars_photo_downloader::ObservationDate) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(cache.resolve_directory(rover, d))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn duplicate_urls_download_once_into_rover_date_directory() {
    let day = date(2017, 2, 27);
    let (_tmp, cache, source, downloader) = setup(FakeSource::new().with_listing(
        Rover::Curiosity,
        day,
        &["https://img/x/a.jpg", "https://img/x/b.jpg", "https://img/x/a.jpg"],
    ));

    let summary = downloader
        .download_photos(&[Rover::Curiosity], &[day], &ShutdownCoordinator::new())
        .await
        .unwrap();

    assert_eq!(summary.downloaded(), 2);
    assert_eq!(source.downloads(), 2);

    let dir = cache.root().join("Curiosity").join("2017-02-27");
    assert_eq!(std::fs::read(dir.join("a.jpg")).unwrap(), body_for("https://img/x/a.jpg"));
    assert_eq!(std::fs::read(dir.join("b.jpg")).unwrap(), body_for("https://img/x/b.jpg"));
    assert_eq!(entries(&cache, Rover::Curiosity, day), vec!["a.jpg", "b.jpg"]);
}

#[tokio::test]
async fn second_run_downloads_nothing_but_lists_again() {
    let day = date(2017, 2, 27);
    let (_tmp, cache, source, downloader) = setup(FakeSource::new().with_listing(
        Rover::Curiosity,
        day,
        &["https://img/1.jpg", "https://img/2.jpg", "https://img/3.jpg"],
    ));
    let cancel = ShutdownCoordinator::new();

    downloader
        .download_photos(&[Rover::Curiosity], &[day], &cancel)
        .await
        .unwrap();
    let before = entries(&cache, Rover::Curiosity, day);
    let first_bytes = std::fs::read(cache.photo_path(Rover::Curiosity, day, "2.jpg")).unwrap();

    let summary = downloader
        .download_photos(&[Rover::Curiosity], &[day], &cancel)
        .await
        .unwrap();

    assert_eq!(source.downloads(), 3);
    assert_eq!(source.listings(), 2);
    assert_eq!(summary.downloaded(), 0);
    assert_eq!(summary.skipped(), 3);
    assert_eq!(entries(&cache, Rover::Curiosity, day), before);
    assert_eq!(
        std::fs::read(cache.photo_path(Rover::Curiosity, day, "2.jpg")).unwrap(),
        first_bytes
    );
}

#[tokio::test]
async fn empty_listing_writes_single_marker() {
    let day = date(2012, 8, 1);
    let (_tmp, cache, source, downloader) = setup(FakeSource::new());
    let cancel = ShutdownCoordinator::new();

    let report = downloader
        .download_date(Rover::Curiosity, day, &cancel)
        .await
        .unwrap();

    assert!(report.no_photos);
    assert_eq!(report.listed, 0);
    assert_eq!(entries(&cache, Rover::Curiosity, day), vec![NO_PHOTOS_MARKER]);
    assert_eq!(cache.state(Rover::Curiosity, day).unwrap(), CacheState::NoPhotos);

    // Re-querying a confirmed-empty date still asks the API.
    downloader
        .download_date(Rover::Curiosity, day, &cancel)
        .await
        .unwrap();
    assert_eq!(source.listings(), 2);
    assert_eq!(entries(&cache, Rover::Curiosity, day), vec![NO_PHOTOS_MARKER]);
}

#[tokio::test]
async fn one_failing_photo_does_not_stop_siblings() {
    let day = date(2016, 7, 13);
    let urls = [
        "https://img/1.jpg",
        "https://img/2.jpg",
        "https://img/3.jpg",
        "https://img/4.jpg",
        "https://img/5.jpg",
    ];
    let (_tmp, cache, source, downloader) = setup(
        FakeSource::new()
            .with_listing(Rover::Opportunity, day, &urls)
            .with_failing_url("https://img/3.jpg"),
    );

    let err = downloader
        .download_date(Rover::Opportunity, day, &ShutdownCoordinator::new())
        .await
        .unwrap_err();

    match err {
        DownloadError::BatchFailed {
            rover,
            date: failed_date,
            failed,
            first,
        } => {
            assert_eq!(rover, Rover::Opportunity);
            assert_eq!(failed_date, day);
            assert_eq!(failed, 1);
            assert!(matches!(*first, DownloadError::HttpStatus { status: 500, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(source.downloads(), 5);
    assert_eq!(
        cache.list_cached_files(Rover::Opportunity, day).unwrap(),
        vec!["1.jpg", "2.jpg", "4.jpg", "5.jpg"]
    );
    assert!(!cache.has_no_photos_marker(Rover::Opportunity, day));
}

#[tokio::test]
async fn write_failure_is_isolated_to_its_photo() {
    let day = date(2017, 3, 1);
    let (_tmp, cache, source, downloader) = setup(FakeSource::new().with_listing(
        Rover::Curiosity,
        day,
        &["https://img/a.jpg", "https://img/b.jpg", "https://img/c.jpg", "https://img/d.jpg"],
    ));
    // A directory squatting on the target name makes the final rename fail.
    std::fs::create_dir_all(cache.photo_path(Rover::Curiosity, day, "c.jpg")).unwrap();

    let err = downloader
        .download_date(Rover::Curiosity, day, &ShutdownCoordinator::new())
        .await
        .unwrap_err();

    match err {
        DownloadError::BatchFailed { failed, first, .. } => {
            assert_eq!(failed, 1);
            assert!(matches!(*first, DownloadError::CacheWriteError(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(source.downloads(), 4);
    assert_eq!(
        cache.list_cached_files(Rover::Curiosity, day).unwrap(),
        vec!["a.jpg", "b.jpg", "d.jpg"]
    );
}

#[tokio::test]
async fn all_downloads_failing_leaves_directory_incomplete() {
    let day = date(2016, 7, 14);
    let (_tmp, cache, _source, downloader) = setup(
        FakeSource::new()
            .with_listing(Rover::Spirit, day, &["https://img/only.jpg"])
            .with_failing_url("https://img/only.jpg"),
    );

    let result = downloader
        .download_date(Rover::Spirit, day, &ShutdownCoordinator::new())
        .await;

    assert!(matches!(result, Err(DownloadError::BatchFailed { .. })));
    assert_eq!(cache.state(Rover::Spirit, day).unwrap(), CacheState::Incomplete);
}

#[tokio::test]
async fn listing_failure_stops_the_run() {
    let first = date(2017, 2, 27);
    let second = date(2017, 2, 28);
    let (_tmp, cache, source, downloader) = setup(
        FakeSource::new()
            .with_failing_listing(Rover::Curiosity, first)
            .with_listing(Rover::Curiosity, second, &["https://img/a.jpg"]),
    );

    let err = downloader
        .download_photos(&[Rover::Curiosity], &[first, second], &ShutdownCoordinator::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::NetworkError(_)));
    assert_eq!(source.listings(), 1);
    assert_eq!(source.downloads(), 0);
    assert_eq!(cache.state(Rover::Curiosity, second).unwrap(), CacheState::NotQueried);
}

#[tokio::test]
async fn rovers_outer_dates_inner() {
    let d1 = date(2017, 2, 27);
    let d2 = date(2017, 2, 28);
    let (_tmp, _cache, _source, downloader) = setup(FakeSource::new());

    let summary = downloader
        .download_photos(
            &[Rover::Spirit, Rover::Curiosity],
            &[d1, d2],
            &ShutdownCoordinator::new(),
        )
        .await
        .unwrap();

    let order: Vec<_> = summary.dates.iter().map(|r| (r.rover, r.date)).collect();
    assert_eq!(
        order,
        vec![
            (Rover::Spirit, d1),
            (Rover::Spirit, d2),
            (Rover::Curiosity, d1),
            (Rover::Curiosity, d2),
        ]
    );
    assert_eq!(summary.no_photo_dates(), 4);
}
