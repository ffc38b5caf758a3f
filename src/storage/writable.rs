//! Append-only buffer file
//!
//! A [`WritableFile`] accepts frames until it is closed, its write window
//! elapses, or the next frame would push it past `max_file_size`. Any of
//! those turns the handle into a permanent `Failed`; the folder manager
//! then rolls to a new file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::errors::{BufferError, BufferResult};
use super::record::{encode_frame, frame_len};
use super::result::WritableResult;
use crate::clock::Clock;
use crate::config::StorageConfiguration;
use crate::crash_point::{maybe_crash, points};

/// The file currently receiving writes in a signal folder.
#[derive(Debug)]
pub struct WritableFile {
    path: PathBuf,
    created_millis: u64,
    file: Option<File>,
    size: u64,
    max_file_size: u64,
    expire_at: u64,
    clock: Arc<dyn Clock>,
}

impl WritableFile {
    /// Create a new, empty file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file already exists or cannot be created.
    pub fn create(
        path: &Path,
        created_millis: u64,
        config: &StorageConfiguration,
        clock: Arc<dyn Clock>,
    ) -> BufferResult<Self> {
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(path)
            .map_err(|e| BufferError::io(format!("Failed to create {}", path.display()), e))?;

        Ok(Self {
            path: path.to_path_buf(),
            created_millis,
            file: Some(file),
            size: 0,
            max_file_size: config.max_file_size(),
            expire_at: created_millis.saturating_add(config.max_file_age_for_write_millis()),
            clock,
        })
    }

    /// Append one frame carrying `payload`, synced before returning.
    ///
    /// Returns `Failed` (and closes the file) once the write window has
    /// elapsed or the frame does not fit. An I/O error rolls back any
    /// partially written bytes, closes the file and is returned as `Err`.
    pub fn append(&mut self, payload: &[u8]) -> BufferResult<WritableResult> {
        if self.file.is_none() {
            return Ok(WritableResult::Failed);
        }
        if self.has_expired() {
            debug!(path = ?self.path, "Write window elapsed");
            self.close();
            return Ok(WritableResult::Failed);
        }
        let incoming = frame_len(payload.len() as u64);
        if !self.fits(incoming) {
            debug!(path = ?self.path, size = self.size, incoming, "File full");
            self.close();
            return Ok(WritableResult::Failed);
        }

        let frame = encode_frame(payload);
        if let Err(e) = self.write_frame(&frame) {
            self.rollback();
            return Err(e);
        }

        self.size += incoming;
        Ok(WritableResult::Succeeded)
    }

    fn write_frame(&mut self, frame: &[u8]) -> BufferResult<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(BufferError::Closed);
        };

        file.write_all(frame)
            .map_err(|e| BufferError::io(format!("Failed to append to {}", self.path.display()), e))?;

        maybe_crash(points::WRITABLE_BEFORE_SYNC);

        file.sync_data()
            .map_err(|e| BufferError::io(format!("Failed to sync {}", self.path.display()), e))
    }

    // Cut the file back to the last complete frame so readers never see a
    // torn write, then stop using it.
    fn rollback(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.set_len(self.size).and_then(|_| file.sync_all()) {
                warn!(path = ?self.path, error = %e, "Failed to roll back partial frame");
            }
        }
    }

    /// Whether a frame of `incoming` bytes still fits under the size cap.
    pub fn fits(&self, incoming: u64) -> bool {
        self.size.saturating_add(incoming) <= self.max_file_size
    }

    /// Whether the write window has elapsed.
    pub fn has_expired(&self) -> bool {
        self.clock.now_millis() >= self.expire_at
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_millis(&self) -> u64 {
        self.created_millis
    }

    /// Bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Stop accepting writes. Every frame was synced on append.
    pub fn close(&mut self) {
        self.file = None;
    }
}
