//! Disk-backed buffer for telemetry batches
//!
//! One folder per signal type, holding files named by their creation time
//! in milliseconds. Each file moves through a fixed lifecycle:
//!
//! ```text
//! writable -> too young to read -> readable -> expired (deleted)
//!                                      |
//!                                      +-> drained (deleted)
//! ```
//!
//! # Durability
//!
//! - every frame is synced before `write` returns
//! - consumed bytes are truncated from the front of a file, durably, before
//!   `acknowledge` returns
//! - a batch read but not acknowledged is delivered again
//!
//! # Capacity
//!
//! Each file is capped at `max_file_size` and each folder at
//! `max_folder_size`. When a write would exceed the folder cap the oldest
//! files are deleted. Buffered data is dropped, writers never block.

mod cursor;
mod errors;
mod facade;
mod folder;
mod readable;
mod record;
mod result;
mod shared;
mod writable;

pub use cursor::{fsync_dir, tmp_path, FileStream};
pub use errors::{BufferError, BufferResult};
pub use facade::{Storage, MAX_ATTEMPTS};
pub use folder::{CacheFile, FileState, FolderManager};
pub use readable::{FrameRead, ReadableFile};
pub use record::{compute_checksum, encode_frame, frame_len, FrameHeader, HEADER_LEN, MAX_PAYLOAD_LEN};
pub use result::{
    Batch, ProcessResult, ProcessingFailure, ReadOperation, ReadableResult, Receipt,
    WritableResult, WriteResult,
};
pub use shared::SharedStorage;
pub use writable::WritableFile;
