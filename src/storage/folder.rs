//! Per-signal folder bookkeeping
//!
//! A [`FolderManager`] owns one signal folder and answers two questions:
//! which file to write to, and which file to read from. Files are named by
//! their creation time in milliseconds, so the directory listing alone
//! yields the lifecycle state of every file:
//!
//! ```text
//! age <  max_file_age_for_write   writable (only the current writable file)
//! age <  min_file_age_for_read    too young to read
//! age <  max_file_age_for_read    readable
//! age >= max_file_age_for_read    expired, deleted unread
//! ```
//!
//! Because the read window opens strictly after the write window closes, a
//! file is never written and read at the same time and no locking is needed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::cursor::{fsync_dir, TMP_SUFFIX};
use super::errors::{BufferError, BufferResult};
use super::readable::ReadableFile;
use super::record::frame_len;
use super::writable::WritableFile;
use crate::clock::Clock;
use crate::config::StorageConfiguration;
use crate::observability::{Event, MetricsRegistry};

/// A buffer file as seen in the directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheFile {
    pub path: PathBuf,
    pub created_millis: u64,
    pub size: u64,
}

impl CacheFile {
    pub fn age_millis(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_millis)
    }
}

/// Lifecycle state of a buffer file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Writable,
    TooYoungToRead,
    Readable,
    Expired,
}

/// Selects writable and readable files in one signal folder and enforces
/// the folder size cap.
#[derive(Debug)]
pub struct FolderManager {
    folder: PathBuf,
    config: StorageConfiguration,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricsRegistry>,
    writable: Option<WritableFile>,
    readable: Option<ReadableFile>,
}

impl FolderManager {
    /// Open `folder`, creating it if needed and removing leftovers of an
    /// interrupted truncation.
    pub fn open(
        folder: PathBuf,
        config: StorageConfiguration,
        clock: Arc<dyn Clock>,
        metrics: Arc<MetricsRegistry>,
    ) -> BufferResult<Self> {
        fs::create_dir_all(&folder).map_err(|e| {
            BufferError::io(format!("Failed to create folder {}", folder.display()), e)
        })?;

        let manager = Self {
            folder,
            config,
            clock,
            metrics,
            writable: None,
            readable: None,
        };
        manager.remove_leftovers()?;
        Ok(manager)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn config(&self) -> &StorageConfiguration {
        &self.config
    }

    fn remove_leftovers(&self) -> BufferResult<()> {
        let entries = fs::read_dir(&self.folder).map_err(|e| {
            BufferError::io(format!("Failed to list {}", self.folder.display()), e)
        })?;

        for entry in entries {
            let path = entry
                .map_err(|e| BufferError::io("Failed to read directory entry", e))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(TMP_SUFFIX) {
                continue;
            }
            remove_if_exists(&path)?;
            info!(event = %Event::TempFileRemoved, path = ?path, "Removed interrupted truncation");
        }
        Ok(())
    }

    /// List buffer files oldest first.
    ///
    /// Entries whose name is not a decimal timestamp are ignored. Equal
    /// timestamps are ordered by file name.
    pub fn list_files(&self) -> BufferResult<Vec<CacheFile>> {
        let entries = fs::read_dir(&self.folder).map_err(|e| {
            BufferError::io(format!("Failed to list {}", self.folder.display()), e)
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BufferError::io("Failed to read directory entry", e))?;
            let path = entry.path();
            let Some(created_millis) = parse_file_name(&path) else {
                continue;
            };
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(BufferError::io(
                        format!("Failed to stat {}", path.display()),
                        e,
                    ))
                }
            };
            if !metadata.is_file() {
                continue;
            }
            files.push(CacheFile {
                path,
                created_millis,
                size: metadata.len(),
            });
        }

        files.sort_by(|a, b| {
            a.created_millis
                .cmp(&b.created_millis)
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(files)
    }

    /// Lifecycle state of `file` at time `now`.
    pub fn classify(&self, file: &CacheFile, now: u64) -> FileState {
        if self.is_current_writable(&file.path) {
            return FileState::Writable;
        }
        let age = file.age_millis(now);
        if age >= self.config.max_file_age_for_read_millis() {
            FileState::Expired
        } else if age < self.config.min_file_age_for_read_millis() {
            FileState::TooYoungToRead
        } else {
            FileState::Readable
        }
    }

    /// Every file with its current state, oldest first.
    pub fn file_states(&self) -> BufferResult<Vec<(CacheFile, FileState)>> {
        let now = self.clock.now_millis();
        Ok(self
            .list_files()?
            .into_iter()
            .map(|file| {
                let state = self.classify(&file, now);
                (file, state)
            })
            .collect())
    }

    /// Total bytes in the folder.
    pub fn total_size(&self) -> BufferResult<u64> {
        Ok(self.list_files()?.iter().map(|f| f.size).sum())
    }

    fn is_current_writable(&self, path: &Path) -> bool {
        self.writable
            .as_ref()
            .map(|w| w.path() == path)
            .unwrap_or(false)
    }

    /// The file the next payload of `payload_len` bytes goes to.
    ///
    /// Rolls to a new file when there is no usable current one, then evicts
    /// the oldest files until the frame fits under the folder cap.
    ///
    /// # Errors
    ///
    /// - `PayloadTooLarge` if the frame can never fit in one file
    /// - `FolderFull` if eviction cannot make room
    pub fn writable_file(&mut self, payload_len: u64) -> BufferResult<&mut WritableFile> {
        let incoming = frame_len(payload_len);
        if incoming > self.config.max_file_size() {
            return Err(BufferError::PayloadTooLarge {
                size: incoming,
                limit: self.config.max_file_size(),
            });
        }

        let needs_roll = match &self.writable {
            None => true,
            Some(w) => w.is_closed() || w.has_expired() || !w.fits(incoming),
        };
        if needs_roll {
            self.roll()?;
        }

        self.ensure_capacity(incoming)?;

        match self.writable.as_mut() {
            Some(writable) => Ok(writable),
            None => Err(BufferError::io(
                "Writable file vanished during eviction",
                io::Error::new(io::ErrorKind::NotFound, self.folder.display().to_string()),
            )),
        }
    }

    fn roll(&mut self) -> BufferResult<()> {
        self.close_writable();
        self.purge_expired()?;

        // Names must be unique and increase even if the clock stalls or
        // steps back.
        let now = self.clock.now_millis();
        let created_millis = match self.list_files()?.last() {
            Some(newest) => now.max(newest.created_millis.saturating_add(1)),
            None => now,
        };

        let path = self.folder.join(created_millis.to_string());
        let file = WritableFile::create(&path, created_millis, &self.config, Arc::clone(&self.clock))?;
        self.metrics.increment_files_created();
        info!(event = %Event::FileCreated, path = ?path, "Created buffer file");

        self.writable = Some(file);
        Ok(())
    }

    fn ensure_capacity(&mut self, incoming: u64) -> BufferResult<()> {
        let limit = self.config.max_folder_size();
        let mut files = self.list_files()?;
        let mut total: u64 = files.iter().map(|f| f.size).sum();

        while total.saturating_add(incoming) > limit {
            let Some(pos) = files.iter().position(|f| !self.is_current_writable(&f.path)) else {
                return Err(BufferError::FolderFull {
                    needed: total.saturating_add(incoming),
                    limit,
                });
            };
            let victim = files.remove(pos);
            self.remove(&victim.path)?;
            total -= victim.size;

            self.metrics.increment_files_evicted();
            warn!(
                event = %Event::FileEvicted,
                path = ?victim.path,
                size = victim.size,
                limit,
                "Evicted oldest file to stay under folder cap"
            );
        }
        Ok(())
    }

    /// Delete every expired file except the current writable one.
    pub fn purge_expired(&mut self) -> BufferResult<usize> {
        let now = self.clock.now_millis();
        let mut purged = 0;
        for file in self.list_files()? {
            if self.classify(&file, now) != FileState::Expired {
                continue;
            }
            self.remove(&file.path)?;
            self.metrics.increment_files_expired();
            warn!(
                event = %Event::FileExpired,
                path = ?file.path,
                size = file.size,
                "Deleted expired file"
            );
            purged += 1;
        }
        Ok(purged)
    }

    /// The file to read from, if any is eligible.
    ///
    /// Keeps the currently open readable file unless `exclude` rejects it.
    /// Otherwise walks the folder oldest first, skipping the current
    /// writable file and every file `exclude` matches, deleting expired
    /// files on the way, and opens the first one old enough to read.
    pub fn get_readable_file<F>(&mut self, exclude: F) -> BufferResult<Option<&mut ReadableFile>>
    where
        F: Fn(&CacheFile) -> bool,
    {
        let excluded = self.readable.as_ref().map(|current| {
            exclude(&CacheFile {
                path: current.path().to_path_buf(),
                created_millis: current.created_millis(),
                size: current.len(),
            })
        });
        if excluded == Some(true) {
            self.release_readable();
        }

        if self.readable.is_none() {
            self.select_readable(&exclude)?;
        }
        Ok(self.readable.as_mut())
    }

    fn select_readable<F>(&mut self, exclude: &F) -> BufferResult<()>
    where
        F: Fn(&CacheFile) -> bool,
    {
        // A writable file past its write window is an ordinary file now.
        if self.writable.as_ref().map(|w| w.has_expired()).unwrap_or(false) {
            self.close_writable();
        }

        let now = self.clock.now_millis();
        for file in self.list_files()? {
            if exclude(&file) {
                continue;
            }
            match self.classify(&file, now) {
                FileState::Writable => continue,
                FileState::Expired => {
                    self.remove(&file.path)?;
                    self.metrics.increment_files_expired();
                    warn!(
                        event = %Event::FileExpired,
                        path = ?file.path,
                        size = file.size,
                        "Deleted expired file"
                    );
                }
                // Every later file is younger still.
                FileState::TooYoungToRead => break,
                FileState::Readable => {
                    let readable = ReadableFile::open(
                        &file.path,
                        file.created_millis,
                        &self.config,
                        Arc::clone(&self.clock),
                    )?;
                    debug!(path = ?file.path, size = file.size, "Opened file for reading");
                    self.readable = Some(readable);
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// The currently open readable file.
    pub fn readable_mut(&mut self) -> Option<&mut ReadableFile> {
        self.readable.as_mut()
    }

    /// Close the readable file and delete it from disk.
    pub fn delete_readable(&mut self) -> BufferResult<Option<PathBuf>> {
        let Some(readable) = self.readable.take() else {
            return Ok(None);
        };
        let path = readable.path().to_path_buf();
        readable.close();
        remove_if_exists(&path)?;
        fsync_dir(&self.folder)?;
        Ok(Some(path))
    }

    /// Close the readable file, leaving it on disk.
    pub fn release_readable(&mut self) {
        if let Some(readable) = self.readable.take() {
            debug!(path = ?readable.path(), "Released readable file");
            readable.close();
        }
    }

    /// Stop writing to the current file.
    pub fn close_writable(&mut self) {
        if let Some(mut writable) = self.writable.take() {
            writable.close();
            debug!(
                event = %Event::FileRolled,
                path = ?writable.path(),
                size = writable.size(),
                "Released writable file"
            );
        }
    }

    fn remove(&mut self, path: &Path) -> BufferResult<()> {
        if self.readable.as_ref().map(|r| r.path() == path).unwrap_or(false) {
            self.release_readable();
        }
        if self.is_current_writable(path) {
            self.close_writable();
        }
        remove_if_exists(path)?;
        fsync_dir(&self.folder)
    }

    /// Delete every buffered file. Returns the number of files removed.
    pub fn clear(&mut self) -> BufferResult<usize> {
        self.release_readable();
        self.close_writable();

        let files = self.list_files()?;
        for file in &files {
            remove_if_exists(&file.path)?;
        }
        self.remove_leftovers()?;
        fsync_dir(&self.folder)?;

        info!(event = %Event::StorageCleared, folder = ?self.folder, files = files.len(), "Cleared folder");
        Ok(files.len())
    }

    /// Release both file handles.
    pub fn close(&mut self) {
        self.release_readable();
        self.close_writable();
    }
}

fn parse_file_name(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

fn remove_if_exists(path: &Path) -> BufferResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BufferError::io(format!("Failed to delete {}", path.display()), e)),
    }
}
