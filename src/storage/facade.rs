//! Storage facade for one signal folder
//!
//! Ties the serializer to the folder manager. Producers call
//! [`Storage::write`]; a consumer loop calls [`Storage::read`] and settles
//! each batch with [`Storage::acknowledge`] or [`Storage::release`], or
//! uses [`Storage::read_and_process`] to do all three in one call.
//!
//! Delivery is at-least-once: bytes leave the disk only after the consumer
//! acknowledges them, and a batch read but never settled is delivered again.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::errors::{BufferError, BufferResult};
use super::folder::{CacheFile, FolderManager};
use super::readable::{FrameRead, ReadableFile};
use super::record::MAX_PAYLOAD_LEN;
use super::result::{
    Batch, ProcessResult, ProcessingFailure, ReadOperation, ReadableResult, Receipt,
    WritableResult, WriteResult,
};
use crate::clock::Clock;
use crate::config::StorageConfiguration;
use crate::observability::{Event, MetricsRegistry, MetricsSnapshot};
use crate::serialization::Serializer;
use crate::signal::SignalType;

/// Attempts per write before giving up on full or expired files.
pub const MAX_ATTEMPTS: usize = 3;

/// Disk buffer for one signal type.
pub struct Storage<S: Serializer> {
    signal: SignalType,
    folder: FolderManager,
    serializer: S,
    metrics: Arc<MetricsRegistry>,
    closed: bool,
}

impl<S: Serializer> Storage<S> {
    /// Open the folder for `signal` under the configured root directory.
    pub fn open(
        config: StorageConfiguration,
        signal: SignalType,
        serializer: S,
        clock: Arc<dyn Clock>,
    ) -> BufferResult<Self> {
        let metrics = Arc::new(MetricsRegistry::new());
        let path = config.root_dir().join(signal.folder_name());
        let folder = FolderManager::open(path, config, clock, Arc::clone(&metrics))?;

        info!(
            event = %Event::StorageOpened,
            signal = %signal,
            folder = ?folder.folder(),
            "Opened disk buffer"
        );

        Ok(Self {
            signal,
            folder,
            serializer,
            metrics,
            closed: false,
        })
    }

    pub fn signal(&self) -> SignalType {
        self.signal
    }

    pub fn folder(&self) -> &FolderManager {
        &self.folder
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Serialize `items` and append them as one frame.
    ///
    /// Never returns `Err`; a dropped batch is `WriteResult::Failed` with
    /// the cause when there is one.
    pub fn write(&mut self, items: &[S::Item]) -> WriteResult {
        match self.try_write(items) {
            Ok(WritableResult::Succeeded) => WriteResult::Succeeded,
            Ok(WritableResult::Failed) => {
                self.metrics.increment_write_failures();
                warn!(
                    event = %Event::WriteFailed,
                    signal = %self.signal,
                    attempts = MAX_ATTEMPTS,
                    "No usable file for batch"
                );
                WriteResult::Failed { cause: None }
            }
            Err(e) => {
                self.metrics.increment_write_failures();
                warn!(
                    event = %Event::WriteFailed,
                    signal = %self.signal,
                    code = e.code(),
                    error = %e,
                    "Dropped batch"
                );
                WriteResult::Failed { cause: Some(e) }
            }
        }
    }

    fn try_write(&mut self, items: &[S::Item]) -> BufferResult<WritableResult> {
        if self.closed {
            return Err(BufferError::Closed);
        }

        let payload = self.serializer.serialize(items)?;
        let payload_len = payload.len() as u64;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(BufferError::PayloadTooLarge {
                size: payload_len,
                limit: MAX_PAYLOAD_LEN,
            });
        }

        for _ in 0..MAX_ATTEMPTS {
            let writable = self.folder.writable_file(payload_len)?;
            if writable.append(&payload)? == WritableResult::Succeeded {
                self.metrics.record_write(payload_len);
                debug!(
                    event = %Event::BatchWritten,
                    signal = %self.signal,
                    items = items.len(),
                    bytes = payload_len,
                    "Buffered batch"
                );
                return Ok(WritableResult::Succeeded);
            }
        }
        Ok(WritableResult::Failed)
    }

    /// Read the oldest unacknowledged batch.
    pub fn read(&mut self) -> ReadOperation<S::Item> {
        self.read_excluding(|_| false)
    }

    /// Like [`Storage::read`], skipping files matched by `exclude`.
    pub fn read_excluding<F>(&mut self, exclude: F) -> ReadOperation<S::Item>
    where
        F: Fn(&CacheFile) -> bool,
    {
        if self.closed {
            return ReadOperation::Closed;
        }

        // Each pass either returns or deletes a drained file, so this ends.
        loop {
            let readable = match self.folder.get_readable_file(&exclude) {
                Ok(Some(readable)) => readable,
                Ok(None) => return ReadOperation::NoContentAvailable,
                Err(e) => return self.processing_failed(e, None),
            };

            if readable.has_expired() {
                return self.expire_readable();
            }

            let file_id = readable.created_millis();
            let path = readable.path().to_path_buf();
            match readable.read_next() {
                Ok(FrameRead::End) => {
                    if let Err(e) = self.drain_readable() {
                        return self.processing_failed(e, None);
                    }
                }
                Ok(FrameRead::Corrupt {
                    reason,
                    discard_len,
                }) => {
                    let receipt = Receipt {
                        file_id,
                        frame_len: discard_len,
                    };
                    let cause = BufferError::CorruptFrame {
                        file: path,
                        offset: 0,
                        reason,
                    };
                    return self.processing_failed(cause, Some(receipt));
                }
                Ok(FrameRead::Frame { payload, frame_len }) => {
                    let receipt = Receipt { file_id, frame_len };
                    return match self.serializer.deserialize(&payload) {
                        Ok(items) => {
                            self.metrics.increment_batches_read();
                            debug!(
                                event = %Event::BatchRead,
                                signal = %self.signal,
                                file_id,
                                items = items.len(),
                                bytes = frame_len,
                                "Read batch"
                            );
                            ReadOperation::Succeeded(Batch { items, receipt })
                        }
                        Err(e) => self.processing_failed(e.into(), Some(receipt)),
                    };
                }
                Err(e) => {
                    // The file stays as it is; the next read starts over.
                    self.folder.release_readable();
                    return self.processing_failed(e, None);
                }
            }
        }
    }

    fn expire_readable(&mut self) -> ReadOperation<S::Item> {
        match self.folder.delete_readable() {
            Ok(path) => {
                self.metrics.increment_files_expired();
                warn!(
                    event = %Event::FileExpired,
                    signal = %self.signal,
                    path = ?path,
                    "Read window closed before file was drained"
                );
                ReadOperation::FileHasExpired
            }
            Err(e) => self.processing_failed(e, None),
        }
    }

    fn drain_readable(&mut self) -> BufferResult<()> {
        if let Some(path) = self.folder.delete_readable()? {
            self.metrics.increment_files_drained();
            info!(event = %Event::FileDrained, signal = %self.signal, path = ?path, "Deleted drained file");
        }
        Ok(())
    }

    fn processing_failed(
        &self,
        cause: BufferError,
        receipt: Option<Receipt>,
    ) -> ReadOperation<S::Item> {
        self.metrics.increment_processing_failures();
        warn!(
            event = %Event::ProcessingFailed,
            signal = %self.signal,
            code = cause.code(),
            error = %cause,
            "Read failed"
        );
        ReadOperation::ProcessingFailed(ProcessingFailure { cause, receipt })
    }

    /// Permanently remove the frame behind `receipt`. Deletes the file once
    /// nothing is left in it.
    ///
    /// # Errors
    ///
    /// - `Closed` after [`Storage::close`]
    /// - `StaleReceipt` if `receipt` is not the pending frame of the open file
    /// - `Io` if truncation fails; the frame is then still on disk
    pub fn acknowledge(&mut self, receipt: Receipt) -> BufferResult<()> {
        if self.closed {
            return Err(BufferError::Closed);
        }

        let readable = self.pending_file(receipt)?;
        let drained = readable.remove_top(receipt.frame_len)?;

        self.metrics.increment_batches_acknowledged();
        debug!(
            event = %Event::BatchAcknowledged,
            signal = %self.signal,
            file_id = receipt.file_id,
            bytes = receipt.frame_len,
            "Acknowledged batch"
        );

        if drained {
            self.drain_readable()?;
        }
        Ok(())
    }

    /// Give the frame behind `receipt` back; it is delivered again by the
    /// next read. The file is not modified.
    pub fn release(&mut self, receipt: Receipt) -> BufferResult<()> {
        if self.closed {
            return Err(BufferError::Closed);
        }

        self.pending_file(receipt)?.release()?;

        self.metrics.increment_batches_released();
        debug!(
            event = %Event::BatchReleased,
            signal = %self.signal,
            file_id = receipt.file_id,
            "Released batch"
        );
        Ok(())
    }

    fn pending_file(&mut self, receipt: Receipt) -> BufferResult<&mut ReadableFile> {
        match self.folder.readable_mut() {
            Some(readable)
                if readable.created_millis() == receipt.file_id
                    && readable.pending() == Some(receipt.frame_len) =>
            {
                Ok(readable)
            }
            _ => Err(BufferError::StaleReceipt),
        }
    }

    /// Read one batch and hand it to `process`.
    ///
    /// `Succeeded` and `ContentInvalid` drop the frame; `TryLater` keeps it
    /// for the next call. Frames that fail to decode are kept and reported
    /// as `ProcessingFailed` without calling `process`.
    pub fn read_and_process<F>(&mut self, process: F) -> ReadableResult
    where
        F: FnOnce(&[S::Item]) -> ProcessResult,
    {
        let batch = match self.read() {
            ReadOperation::Succeeded(batch) => batch,
            other => return other.status(),
        };

        let verdict = process(&batch.items);
        let settled = match verdict {
            ProcessResult::Succeeded | ProcessResult::ContentInvalid => {
                self.acknowledge(batch.receipt)
            }
            ProcessResult::TryLater => self.release(batch.receipt),
        };

        match (verdict, settled) {
            (ProcessResult::Succeeded, Ok(())) => ReadableResult::Succeeded,
            (_, Err(e)) => {
                self.metrics.increment_processing_failures();
                warn!(
                    event = %Event::ProcessingFailed,
                    signal = %self.signal,
                    code = e.code(),
                    error = %e,
                    "Failed to settle batch"
                );
                ReadableResult::ProcessingFailed
            }
            (_, Ok(())) => ReadableResult::ProcessingFailed,
        }
    }

    /// Delete every file of this signal folder.
    pub fn clear(&mut self) -> BufferResult<usize> {
        self.folder.clear()
    }

    /// Delete expired files without reading them.
    pub fn purge_expired(&mut self) -> BufferResult<usize> {
        self.folder.purge_expired()
    }

    /// Release both file handles. Every frame and every truncation was
    /// synced when its call returned, so nothing is flushed here.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.folder.close();
        info!(event = %Event::StorageClosed, signal = %self.signal, "Closed disk buffer");
    }
}

impl<S: Serializer> Drop for Storage<S> {
    fn drop(&mut self) {
        self.close();
    }
}
