//! Result values returned across the storage boundary
//!
//! `write` and `read` never return `Err`; every outcome, expected or not,
//! is one of these values.

use std::fmt;

use super::errors::BufferError;

/// Outcome of appending to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritableResult {
    Succeeded,
    Failed,
}

/// Status of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadableResult {
    Succeeded,
    Closed,
    FileHasExpired,
    ProcessingFailed,
    NoContentAvailable,
}

impl ReadableResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadableResult::Succeeded => "SUCCEEDED",
            ReadableResult::Closed => "CLOSED",
            ReadableResult::FileHasExpired => "FILE_HAS_EXPIRED",
            ReadableResult::ProcessingFailed => "PROCESSING_FAILED",
            ReadableResult::NoContentAvailable => "NO_CONTENT_AVAILABLE",
        }
    }
}

impl fmt::Display for ReadableResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of `Storage::write`.
#[derive(Debug)]
pub enum WriteResult {
    Succeeded,
    /// The batch was dropped. `cause` is absent when every attempt found
    /// an unusable file rather than hitting an error.
    Failed { cause: Option<BufferError> },
}

impl WriteResult {
    pub fn is_success(&self) -> bool {
        matches!(self, WriteResult::Succeeded)
    }

    pub fn cause(&self) -> Option<&BufferError> {
        match self {
            WriteResult::Failed { cause } => cause.as_ref(),
            WriteResult::Succeeded => None,
        }
    }
}

/// Identifies one delivered frame so the consumer can acknowledge or
/// release exactly that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Receipt {
    /// Creation timestamp of the source file.
    pub file_id: u64,
    /// Bytes the frame occupies at the front of the file.
    pub frame_len: u64,
}

/// A decoded batch plus the receipt to settle it.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub receipt: Receipt,
}

/// Why a read produced no batch.
///
/// `receipt` is present when the failure is tied to specific bytes
/// (corrupt frame, undecodable payload). Acknowledging it discards them.
#[derive(Debug)]
pub struct ProcessingFailure {
    pub cause: BufferError,
    pub receipt: Option<Receipt>,
}

/// Outcome of `Storage::read`.
#[derive(Debug)]
pub enum ReadOperation<T> {
    Succeeded(Batch<T>),
    Closed,
    FileHasExpired,
    ProcessingFailed(ProcessingFailure),
    NoContentAvailable,
}

impl<T> ReadOperation<T> {
    pub fn status(&self) -> ReadableResult {
        match self {
            ReadOperation::Succeeded(_) => ReadableResult::Succeeded,
            ReadOperation::Closed => ReadableResult::Closed,
            ReadOperation::FileHasExpired => ReadableResult::FileHasExpired,
            ReadOperation::ProcessingFailed(_) => ReadableResult::ProcessingFailed,
            ReadOperation::NoContentAvailable => ReadableResult::NoContentAvailable,
        }
    }

    /// The batch, if the read succeeded.
    pub fn into_batch(self) -> Option<Batch<T>> {
        match self {
            ReadOperation::Succeeded(batch) => Some(batch),
            _ => None,
        }
    }
}

/// Verdict of a `read_and_process` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// Delivered; drop the frame.
    Succeeded,
    /// Keep the frame for a later attempt.
    TryLater,
    /// The batch can never be delivered; drop the frame.
    ContentInvalid,
}
