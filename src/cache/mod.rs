//! On-disk photo cache
//!
//! Layout: `<root>/<Rover>/<yyyy-MM-dd>/<filename>`. The directory tree is the
//! only record of what has been fetched; there is no separate index.
//!
//! A date directory is in one of four states (see [`CacheState`]):
//!
//! - absent: never queried
//! - empty: created but nothing finished, treated as incomplete
//! - one or more photo files: cached, possibly partially
//! - only [`NO_PHOTOS_MARKER`]: queried and confirmed empty
//!
//! Photo files are written through a hidden temp file in the same directory and
//! renamed into place, so a crash never leaves a truncated file under its final
//! name.

use crate::{ObservationDate, Rover};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod catalog;

pub use catalog::{CachedPhoto, PhotoCatalog, PhotoPage};

/// Name of the sentinel file recording "queried, no photos"
pub const NO_PHOTOS_MARKER: &str = "NoPhotos.txt";

/// Prefix of in-progress temp files
pub const TEMP_PREFIX: &str = ".partial-";

const NO_PHOTOS_CONTENT: &[u8] = b"No photos available for this rover on this date.\n";

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem failure
    #[error("IO error: {0}")]
    IoError(String),

    /// Cache root could not be used
    #[error("invalid cache root: {0}")]
    InvalidRoot(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

fn io_error(action: &str, path: &Path, e: std::io::Error) -> CacheError {
    CacheError::IoError(format!("{action} {}: {e}", path.display()))
}

/// State of one rover/date directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Directory does not exist
    NotQueried,
    /// Directory exists but holds nothing usable; retry it
    Incomplete,
    /// Only the no-photos marker is present
    NoPhotos,
    /// Photo files are present
    Cached {
        /// Number of photo files
        files: usize,
    },
}

/// Photo cache rooted at a directory
#[derive(Debug, Clone)]
pub struct PhotoCache {
    root: PathBuf,
}

impl PhotoCache {
    /// Open a cache, creating the root directory if needed
    pub fn open(root: impl AsRef<Path>) -> CacheResult<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(CacheError::InvalidRoot("path is empty".to_string()));
        }

        std::fs::create_dir_all(root).map_err(|e| io_error("Failed to create", root, e))?;
        let root = std::path::absolute(root).map_err(|e| io_error("Failed to resolve", root, e))?;

        debug!(root = %root.display(), "Photo cache opened");
        Ok(Self { root })
    }

    /// Absolute cache root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one rover
    pub fn rover_directory(&self, rover: Rover) -> PathBuf {
        self.root.join(rover.name())
    }

    /// Directory for a rover/date pair: `<root>/<Rover>/<yyyy-MM-dd>`
    pub fn resolve_directory(&self, rover: Rover, date: ObservationDate) -> PathBuf {
        self.rover_directory(rover).join(date.as_canonical())
    }

    /// Full path a photo is cached under
    pub fn photo_path(&self, rover: Rover, date: ObservationDate, filename: &str) -> PathBuf {
        self.resolve_directory(rover, date).join(filename)
    }

    /// Create the rover/date directory if it does not exist
    pub async fn ensure_directory(&self, rover: Rover, date: ObservationDate) -> CacheResult<PathBuf> {
        let dir = self.resolve_directory(rover, date);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("Failed to create", &dir, e))?;
        Ok(dir)
    }

    /// Run synchronous cache work on the blocking pool
    pub async fn run_blocking<T, F>(&self, work: F) -> CacheResult<T>
    where
        F: FnOnce(&PhotoCache) -> CacheResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let cache = self.clone();
        tokio::task::spawn_blocking(move || work(&cache))
            .await
            .map_err(|e| CacheError::IoError(format!("Cache task failed: {e}")))?
    }

    /// Whether a file with exactly this name is already cached
    pub fn is_already_cached(&self, rover: Rover, date: ObservationDate, filename: &str) -> bool {
        self.photo_path(rover, date, filename).is_file()
    }

    /// Whether the no-photos marker is present
    pub fn has_no_photos_marker(&self, rover: Rover, date: ObservationDate) -> bool {
        self.photo_path(rover, date, NO_PHOTOS_MARKER).is_file()
    }

    /// Atomically write a photo into the cache.
    ///
    /// The bytes go to a hidden temp file in the target directory which is then
    /// renamed over `filename`. Rewriting an existing file replaces it.
    pub async fn write_photo(
        &self,
        rover: Rover,
        date: ObservationDate,
        filename: &str,
        bytes: Vec<u8>,
    ) -> CacheResult<PathBuf> {
        let dir = self.resolve_directory(rover, date);
        let target = dir.join(filename);

        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &bytes).map(|_| target))
            .await
            .map_err(|e| CacheError::IoError(format!("Write task failed: {e}")))?
    }

    /// Write the no-photos marker if the directory holds no entries at all.
    ///
    /// Returns `true` if the marker was written. Existing content is never
    /// touched.
    pub fn mark_no_photos_available(&self, rover: Rover, date: ObservationDate) -> CacheResult<bool> {
        let dir = self.resolve_directory(rover, date);
        std::fs::create_dir_all(&dir).map_err(|e| io_error("Failed to create", &dir, e))?;

        if self.entry_count(rover, date)? > 0 {
            debug!(dir = %dir.display(), "Directory not empty, leaving it as is");
            return Ok(false);
        }

        let marker = dir.join(NO_PHOTOS_MARKER);
        std::fs::write(&marker, NO_PHOTOS_CONTENT).map_err(|e| io_error("Failed to write", &marker, e))?;
        info!(rover = %rover, date = %date, "Recorded no photos available");
        Ok(true)
    }

    /// Remove a stale no-photos marker. Returns `true` if one was removed.
    pub fn clear_no_photos_marker(&self, rover: Rover, date: ObservationDate) -> CacheResult<bool> {
        let marker = self.photo_path(rover, date, NO_PHOTOS_MARKER);
        match std::fs::remove_file(&marker) {
            Ok(()) => {
                info!(rover = %rover, date = %date, "Removed stale no-photos marker");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("Failed to remove", &marker, e)),
        }
    }

    /// Number of directory entries of any kind; 0 if the directory is absent
    pub fn entry_count(&self, rover: Rover, date: ObservationDate) -> CacheResult<usize> {
        let dir = self.resolve_directory(rover, date);
        match std::fs::read_dir(&dir) {
            Ok(entries) => Ok(entries.filter_map(Result::ok).count()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(io_error("Failed to read", &dir, e)),
        }
    }

    /// Cached photo filenames, sorted, without the marker or temp files
    pub fn list_cached_files(&self, rover: Rover, date: ObservationDate) -> CacheResult<Vec<String>> {
        let dir = self.resolve_directory(rover, date);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("Failed to read", &dir, e)),
        };

        let mut files: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name != NO_PHOTOS_MARKER && !name.starts_with(TEMP_PREFIX))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Classify a rover/date directory
    pub fn state(&self, rover: Rover, date: ObservationDate) -> CacheResult<CacheState> {
        if !self.resolve_directory(rover, date).is_dir() {
            return Ok(CacheState::NotQueried);
        }

        let files = self.list_cached_files(rover, date)?.len();
        if files > 0 {
            return Ok(CacheState::Cached { files });
        }
        if self.has_no_photos_marker(rover, date) {
            return Ok(CacheState::NoPhotos);
        }
        Ok(CacheState::Incomplete)
    }
}

fn write_atomically(dir: &Path, target: &Path, bytes: &[u8]) -> CacheResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| io_error("Failed to create", dir, e))?;

    let mut temp_file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| io_error("Failed to create temp file in", dir, e))?;

    temp_file
        .write_all(bytes)
        .map_err(|e| io_error("Failed to write temp file for", target, e))?;
    temp_file
        .flush()
        .map_err(|e| io_error("Failed to flush temp file for", target, e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| io_error("Failed to sync temp file for", target, e))?;

    temp_file
        .persist(target)
        .map_err(|e| io_error("Failed to persist", target, e.error))?;

    Ok(())
}
