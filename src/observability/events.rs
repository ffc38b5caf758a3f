//! Observable buffer events
//!
//! Every lifecycle log line carries an `event` field with one of these
//! names, so log consumers can match on a stable vocabulary.

use std::fmt;

/// Observable events in the disk buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Storage lifecycle
    /// Signal folder opened
    StorageOpened,
    /// Storage closed, handles released
    StorageClosed,
    /// All files of a folder deleted on request
    StorageCleared,

    // File lifecycle
    /// New writable file created
    FileCreated,
    /// Writable file released (aged out or full)
    FileRolled,
    /// Oldest file deleted to respect the folder cap
    FileEvicted,
    /// File deleted unread after its read window closed
    FileExpired,
    /// File deleted after its last byte was consumed
    FileDrained,
    /// Leftover from an interrupted truncation removed
    TempFileRemoved,

    // Write path
    /// Batch appended
    BatchWritten,
    /// Batch dropped
    WriteFailed,

    // Read path
    /// Batch handed to a consumer
    BatchRead,
    /// Consumer confirmed a batch; bytes truncated
    BatchAcknowledged,
    /// Consumer gave a batch back for a later retry
    BatchReleased,
    /// Batch could not be decoded or read
    ProcessingFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StorageOpened => "STORAGE_OPENED",
            Event::StorageClosed => "STORAGE_CLOSED",
            Event::StorageCleared => "STORAGE_CLEARED",

            Event::FileCreated => "FILE_CREATED",
            Event::FileRolled => "FILE_ROLLED",
            Event::FileEvicted => "FILE_EVICTED",
            Event::FileExpired => "FILE_EXPIRED",
            Event::FileDrained => "FILE_DRAINED",
            Event::TempFileRemoved => "TEMP_FILE_REMOVED",

            Event::BatchWritten => "BATCH_WRITTEN",
            Event::WriteFailed => "WRITE_FAILED",

            Event::BatchRead => "BATCH_READ",
            Event::BatchAcknowledged => "BATCH_ACKNOWLEDGED",
            Event::BatchReleased => "BATCH_RELEASED",
            Event::ProcessingFailed => "PROCESSING_FAILED",
        }
    }

    /// Returns true if this event means buffered data was lost
    pub fn is_data_loss(&self) -> bool {
        matches!(
            self,
            Event::FileEvicted | Event::FileExpired | Event::WriteFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
