//! Serving-layer queries over a cache filled by the pipeline

use crate::support::{date, FakeSource};
use mars_photo_downloader::cache::PhotoCatalog;
use mars_photo_downloader::shutdown::ShutdownCoordinator;
use mars_photo_downloader::{PhotoCache, PhotoDownloader, Rover};
use std::sync::Arc;
use tempfile::TempDir;

async fn filled_cache() -> (TempDir, PhotoCache) {
    let d1 = date(2017, 2, 27);
    let d2 = date(2017, 2, 28);
    let source = FakeSource::new()
        .with_listing(Rover::Curiosity, d1, &["https://img/c1.jpg", "https://img/c2.jpg"])
        .with_listing(Rover::Curiosity, d2, &["https://img/c3.jpg"])
        .with_listing(Rover::Spirit, d1, &["https://img/s1.jpg"]);

    let temp_dir = TempDir::new().unwrap();
    let cache = PhotoCache::open(temp_dir.path()).unwrap();
    PhotoDownloader::new(Arc::new(source), cache.clone())
        .download_photos(
            &[Rover::Curiosity, Rover::Opportunity, Rover::Spirit],
            &[d1, d2],
            &ShutdownCoordinator::new(),
        )
        .await
        .unwrap();
    (temp_dir, cache)
}

#[tokio::test]
async fn queries_by_rover_date_and_both() {
    let (_tmp, cache) = filled_cache().await;
    let catalog = PhotoCatalog::new(&cache);

    let names = |photos: Vec<mars_photo_downloader::cache::CachedPhoto>| {
        photos.into_iter().map(|p| p.filename).collect::<Vec<_>>()
    };

    assert_eq!(
        names(catalog.for_rover_on_date(Rover::Curiosity, date(2017, 2, 27)).unwrap()),
        vec!["c1.jpg", "c2.jpg"]
    );
    assert_eq!(
        names(catalog.for_rover(Rover::Curiosity).unwrap()),
        vec!["c1.jpg", "c2.jpg", "c3.jpg"]
    );
    assert_eq!(
        names(catalog.on_date(date(2017, 2, 27)).unwrap()),
        vec!["c1.jpg", "c2.jpg", "s1.jpg"]
    );

    // Opportunity only has marker directories.
    assert!(catalog.for_rover(Rover::Opportunity).unwrap().is_empty());
    assert_eq!(catalog.dates_for_rover(Rover::Opportunity).unwrap().len(), 2);
}

#[tokio::test]
async fn browse_pages_through_everything() {
    let (_tmp, cache) = filled_cache().await;
    let catalog = PhotoCatalog::new(&cache);

    let first = catalog.browse(0, 3).unwrap();
    let second = catalog.browse(1, 3).unwrap();
    assert_eq!(first.total, 4);
    assert_eq!(first.photos.len(), 3);
    assert_eq!(second.photos.len(), 1);
    assert_eq!(second.photos[0].filename, "s1.jpg");
    assert!(second.photos[0].path.is_file());
}
