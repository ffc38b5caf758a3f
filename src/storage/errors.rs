//! Buffer error types
//!
//! Error codes:
//! - DISKBUFFER_INVALID_CONFIGURATION
//! - DISKBUFFER_IO_ERROR (retryable)
//! - DISKBUFFER_CLOSED
//! - DISKBUFFER_PAYLOAD_TOO_LARGE
//! - DISKBUFFER_FOLDER_FULL (retryable)
//! - DISKBUFFER_SERIALIZATION_FAILED
//! - DISKBUFFER_CORRUPT_FRAME
//! - DISKBUFFER_STALE_RECEIPT
//! - DISKBUFFER_TASK_FAILED (retryable)

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::serialization::SerializationError;

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors raised by the disk buffer.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Storage is closed")]
    Closed,

    #[error("Payload too large: {size} bytes (max: {limit})")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Folder full: {needed} bytes needed (max: {limit})")]
    FolderFull { needed: u64, limit: u64 },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Corrupt frame in {file} at offset {offset}: {reason}")]
    CorruptFrame {
        file: PathBuf,
        offset: u64,
        reason: String,
    },

    #[error("Receipt does not match the pending batch")]
    StaleReceipt,

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl BufferError {
    /// Wrap an I/O error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        BufferError::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            BufferError::InvalidConfiguration(_) => "DISKBUFFER_INVALID_CONFIGURATION",
            BufferError::Io { .. } => "DISKBUFFER_IO_ERROR",
            BufferError::Closed => "DISKBUFFER_CLOSED",
            BufferError::PayloadTooLarge { .. } => "DISKBUFFER_PAYLOAD_TOO_LARGE",
            BufferError::FolderFull { .. } => "DISKBUFFER_FOLDER_FULL",
            BufferError::Serialization(_) => "DISKBUFFER_SERIALIZATION_FAILED",
            BufferError::CorruptFrame { .. } => "DISKBUFFER_CORRUPT_FRAME",
            BufferError::StaleReceipt => "DISKBUFFER_STALE_RECEIPT",
            BufferError::TaskFailed(_) => "DISKBUFFER_TASK_FAILED",
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BufferError::Io { .. } | BufferError::FolderFull { .. } | BufferError::TaskFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(BufferError::Closed.code(), "DISKBUFFER_CLOSED");
        assert_eq!(
            BufferError::PayloadTooLarge { size: 10, limit: 5 }.code(),
            "DISKBUFFER_PAYLOAD_TOO_LARGE"
        );
        assert_eq!(
            BufferError::io("write", io::Error::new(io::ErrorKind::Other, "disk full")).code(),
            "DISKBUFFER_IO_ERROR"
        );
    }

    #[test]
    fn test_io_errors_are_retryable() {
        let err = BufferError::io("append", io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(err.is_retryable());
        assert!(!BufferError::Closed.is_retryable());
        assert!(!BufferError::StaleReceipt.is_retryable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = BufferError::CorruptFrame {
            file: PathBuf::from("/tmp/logs/1000"),
            offset: 0,
            reason: "checksum mismatch".into(),
        };
        let display = err.to_string();
        assert!(display.contains("/tmp/logs/1000"));
        assert!(display.contains("checksum mismatch"));
    }

    #[test]
    fn test_io_error_exposes_source() {
        use std::error::Error;

        let err = BufferError::io("open", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
    }
}
