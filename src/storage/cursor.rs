//! Read cursor with front truncation
//!
//! A [`FileStream`] owns one buffer file opened for reading and rewriting.
//! It reads sequentially from a byte offset and can permanently discard the
//! file's prefix, either up to the current offset or by an explicit count.
//!
//! Truncation is durable when the call returns:
//! - full drain: `set_len(0)` then fsync
//! - partial: the tail is copied to `<name>.tmp`, fsynced, renamed over the
//!   original, and the directory is fsynced
//!
//! A crash before the rename leaves the original intact plus a `.tmp` file
//! that the folder manager removes on open. A crash after the rename leaves
//! the truncated file. Either way no acknowledged byte is re-delivered more
//! than the at-least-once contract allows.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::trace;

use super::errors::{BufferError, BufferResult};
use crate::crash_point::{maybe_crash, points};

/// Suffix of the scratch file used while truncating.
pub const TMP_SUFFIX: &str = "tmp";

/// Sequential reader over one file, able to drop its consumed prefix.
#[derive(Debug)]
pub struct FileStream {
    path: PathBuf,
    file: File,
    position: u64,
    len: u64,
}

impl FileStream {
    /// Open an existing file for reading and truncation.
    ///
    /// # Errors
    ///
    /// Returns `BufferError::Io` if the file is missing or unreadable.
    pub fn open(path: &Path) -> BufferResult<Self> {
        let file = open_rw(path)?;
        let len = file
            .metadata()
            .map_err(|e| BufferError::io(format!("Failed to stat {}", path.display()), e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            position: 0,
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current read offset from the start of the (remaining) file.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Current file length.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes between the read offset and the end of the file.
    pub fn remaining(&self) -> u64 {
        self.len - self.position
    }

    /// Move the read offset, clamped to the file length.
    pub fn seek_to(&mut self, position: u64) -> BufferResult<()> {
        let position = position.min(self.len);
        self.file
            .seek(SeekFrom::Start(position))
            .map_err(|e| BufferError::io(format!("Failed to seek {}", self.path.display()), e))?;
        self.position = position;
        Ok(())
    }

    pub fn rewind(&mut self) -> BufferResult<()> {
        self.seek_to(0)
    }

    /// Discard everything before the current read offset.
    ///
    /// Afterwards the offset is 0 and reads continue with the byte that
    /// followed the discarded prefix.
    pub fn truncate_top(&mut self) -> BufferResult<()> {
        self.truncate_top_n(self.position)
    }

    /// Discard exactly `n` bytes from the front of the file.
    ///
    /// `n` larger than the file clamps to the file length and leaves an empty
    /// file. Truncating zero bytes, or an empty file, does nothing. The read
    /// offset shifts back by `n` (never below 0).
    pub fn truncate_top_n(&mut self, n: u64) -> BufferResult<()> {
        let n = n.min(self.len);
        if n == 0 {
            return Ok(());
        }

        if n == self.len {
            return self.truncate_all();
        }

        let tail_len = self.len - n;
        let tmp = tmp_path(&self.path);
        let truncated = match self.copy_tail(n, tail_len, &tmp) {
            Ok(file) => file,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        };

        maybe_crash(points::CURSOR_BEFORE_RENAME);

        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(BufferError::io(
                format!("Failed to replace {} with truncated copy", self.path.display()),
                e,
            ));
        }

        maybe_crash(points::CURSOR_AFTER_RENAME);

        // The copy's handle follows the rename; the old one points at the
        // unlinked inode. Adopt it before anything else can fail.
        self.file = truncated;
        self.len = tail_len;
        self.position = self.position.saturating_sub(n);
        self.file
            .seek(SeekFrom::Start(self.position))
            .map_err(|e| BufferError::io(format!("Failed to seek {}", self.path.display()), e))?;

        if let Some(parent) = self.path.parent() {
            fsync_dir(parent)?;
        }

        trace!(path = ?self.path, discarded = n, remaining = tail_len, "Truncated file prefix");
        Ok(())
    }

    fn truncate_all(&mut self) -> BufferResult<()> {
        self.file
            .set_len(0)
            .map_err(|e| BufferError::io(format!("Failed to empty {}", self.path.display()), e))?;
        self.file
            .sync_all()
            .map_err(|e| BufferError::io(format!("Failed to sync {}", self.path.display()), e))?;

        self.len = 0;
        self.position = 0;
        self.seek_to(0)?;

        trace!(path = ?self.path, "Truncated whole file");
        Ok(())
    }

    /// Copy the last `tail_len` bytes into `tmp` and return its synced
    /// read/write handle.
    fn copy_tail(&self, offset: u64, tail_len: u64, tmp: &Path) -> BufferResult<File> {
        let mut src = File::open(&self.path)
            .map_err(|e| BufferError::io(format!("Failed to open {}", self.path.display()), e))?;
        src.seek(SeekFrom::Start(offset))
            .map_err(|e| BufferError::io(format!("Failed to seek {}", self.path.display()), e))?;

        let mut dst = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(tmp)
            .map_err(|e| BufferError::io(format!("Failed to create {}", tmp.display()), e))?;

        let copied = io::copy(&mut src.take(tail_len), &mut dst)
            .map_err(|e| BufferError::io(format!("Failed to copy tail to {}", tmp.display()), e))?;
        if copied != tail_len {
            return Err(BufferError::io(
                format!("Short copy to {}", tmp.display()),
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("copied {} of {} bytes", copied, tail_len),
                ),
            ));
        }

        dst.sync_all()
            .map_err(|e| BufferError::io(format!("Failed to sync {}", tmp.display()), e))?;
        Ok(dst)
    }

    /// Release the handle. Any truncation has already been synced.
    pub fn close(self) {}
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let max = buf.len().min(self.remaining() as usize);
        if max == 0 {
            return Ok(0);
        }
        let n = self.file.read(&mut buf[..max])?;
        self.position += n as u64;
        Ok(n)
    }
}

/// Scratch path used while rewriting `path`.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}

fn open_rw(path: &Path) -> BufferResult<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| BufferError::io(format!("Failed to open {}", path.display()), e))
}

/// fsync a directory so renames and unlinks inside it survive a crash.
pub fn fsync_dir(path: &Path) -> BufferResult<()> {
    let dir = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| BufferError::io(format!("Failed to open directory {}", path.display()), e))?;

    dir.sync_all().map_err(|e| {
        BufferError::io(format!("fsync directory failed: {}", path.display()), e)
    })
}
