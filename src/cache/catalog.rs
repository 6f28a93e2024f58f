//! Read-side view of the photo cache
//!
//! Answers the queries a gallery or serving layer needs: photos for one
//! rover/date, everything for a rover, everything on a date across rovers, and
//! a paged browse over the whole cache. Results are always ordered by
//! (rover, date, filename). Marker-only and empty directories contribute
//! nothing.

use super::{CacheResult, PhotoCache};
use crate::{ObservationDate, Rover};
use serde::Serialize;
use std::path::PathBuf;

/// One cached photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedPhoto {
    /// Rover that took the photo
    pub rover: Rover,
    /// Earth date of the photo
    pub date: ObservationDate,
    /// Filename inside the date directory
    pub filename: String,
    /// Absolute path on disk
    pub path: PathBuf,
}

/// One page of a browse query
#[derive(Debug, Clone, Serialize)]
pub struct PhotoPage {
    /// Zero-based page index that was requested
    pub page: usize,
    /// Page size that was requested
    pub take: usize,
    /// Total photos before paging
    pub total: usize,
    /// Photos on this page
    pub photos: Vec<CachedPhoto>,
}

/// Query interface over a [`PhotoCache`]
pub struct PhotoCatalog<'a> {
    cache: &'a PhotoCache,
}

impl<'a> PhotoCatalog<'a> {
    /// Create a catalog over `cache`
    pub fn new(cache: &'a PhotoCache) -> Self {
        Self { cache }
    }

    /// Photos cached for one rover on one date
    pub fn for_rover_on_date(
        &self,
        rover: Rover,
        date: ObservationDate,
    ) -> CacheResult<Vec<CachedPhoto>> {
        let photos = self
            .cache
            .list_cached_files(rover, date)?
            .into_iter()
            .map(|filename| CachedPhoto {
                rover,
                date,
                path: self.cache.photo_path(rover, date, &filename),
                filename,
            })
            .collect();
        Ok(photos)
    }

    /// Dates with a directory under `rover`, sorted. Names that are not
    /// canonical dates are ignored.
    pub fn dates_for_rover(&self, rover: Rover) -> CacheResult<Vec<ObservationDate>> {
        let dir = self.cache.rover_directory(rover);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(super::io_error("Failed to read", &dir, e));
            }
        };

        let mut dates: Vec<ObservationDate> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| name.parse().ok())
            .collect();
        dates.sort();
        Ok(dates)
    }

    /// Every photo cached for a rover
    pub fn for_rover(&self, rover: Rover) -> CacheResult<Vec<CachedPhoto>> {
        let mut photos = Vec::new();
        for date in self.dates_for_rover(rover)? {
            photos.extend(self.for_rover_on_date(rover, date)?);
        }
        Ok(photos)
    }

    /// Every photo cached on a date, across all rovers
    pub fn on_date(&self, date: ObservationDate) -> CacheResult<Vec<CachedPhoto>> {
        let mut photos = Vec::new();
        for rover in Rover::ALL {
            photos.extend(self.for_rover_on_date(rover, date)?);
        }
        Ok(photos)
    }

    /// Every photo in the cache
    pub fn all(&self) -> CacheResult<Vec<CachedPhoto>> {
        let mut photos = Vec::new();
        for rover in Rover::ALL {
            photos.extend(self.for_rover(rover)?);
        }
        Ok(photos)
    }

    /// Page `page` of size `take`: items `page*take .. page*take+take`.
    ///
    /// A zero `take` or a page past the end yields no photos.
    pub fn browse(&self, page: usize, take: usize) -> CacheResult<PhotoPage> {
        Ok(PhotoPage::slice(self.all()?, page, take))
    }
}

impl PhotoPage {
    /// Cut page `page` of size `take` out of an ordered result
    pub fn slice(photos: Vec<CachedPhoto>, page: usize, take: usize) -> Self {
        let total = photos.len();
        let start = page.saturating_mul(take);

        let photos = photos.into_iter().skip(start).take(take).collect();
        Self {
            page,
            take,
            total,
            photos,
        }
    }
}
