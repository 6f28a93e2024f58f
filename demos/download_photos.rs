//! Example: fetch one day of Curiosity photos through the library API
//!
//! Run with:
//!   MARS_PHOTOS_CACHE_ROOT=./photos cargo run --example download_photos -- 2017-02-27
//!
//! Set NASA_API_KEY to avoid the DEMO_KEY rate limits.

use mars_photo_downloader::cache::PhotoCatalog;
use mars_photo_downloader::config::Settings;
use mars_photo_downloader::dates::parse_date;
use mars_photo_downloader::shutdown::ShutdownCoordinator;
use mars_photo_downloader::Rover;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("mars_photo_downloader=debug")
        .init();

    let raw_date = std::env::args().nth(1).unwrap_or_else(|| "2017-02-27".to_string());
    let date = parse_date(&raw_date).ok_or_else(|| anyhow::anyhow!("not a date: {raw_date}"))?;

    let mut settings = Settings::from_env();
    if settings.cache_root.is_none() {
        settings.cache_root = Some(PathBuf::from("./photos"));
    }
    settings.max_concurrency = 4;

    let downloader = settings.build_downloader()?;
    let cancel = ShutdownCoordinator::shared();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.request_shutdown();
            }
        }
    });

    let summary = downloader
        .download_photos(&[Rover::Curiosity], &[date], &cancel)
        .await?;
    println!(
        "Downloaded {} photo(s), {} already cached",
        summary.downloaded(),
        summary.skipped()
    );

    let catalog = PhotoCatalog::new(downloader.cache());
    for photo in catalog.for_rover_on_date(Rover::Curiosity, date)? {
        println!("{}", photo.path.display());
    }
    Ok(())
}
