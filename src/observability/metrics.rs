//! Buffer counters
//!
//! Counters only, monotonic, reset on process start. Shared between the
//! storage facade and its folder manager through an `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one storage instance.
///
/// Relaxed ordering is enough: counters are read for reporting only.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    bytes_written: AtomicU64,
    batches_written: AtomicU64,
    write_failures: AtomicU64,
    batches_read: AtomicU64,
    batches_acknowledged: AtomicU64,
    batches_released: AtomicU64,
    processing_failures: AtomicU64,
    files_created: AtomicU64,
    files_evicted: AtomicU64,
    files_expired: AtomicU64,
    files_drained: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Write path

    pub fn record_write(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
        self.batches_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Read path

    pub fn increment_batches_read(&self) {
        self.batches_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches_acknowledged(&self) {
        self.batches_acknowledged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches_released(&self) {
        self.batches_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_processing_failures(&self) {
        self.processing_failures.fetch_add(1, Ordering::Relaxed);
    }

    // File lifecycle

    pub fn increment_files_created(&self) {
        self.files_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files_evicted(&self) {
        self.files_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files_expired(&self) {
        self.files_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files_drained(&self) {
        self.files_drained.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            batches_read: self.batches_read.load(Ordering::Relaxed),
            batches_acknowledged: self.batches_acknowledged.load(Ordering::Relaxed),
            batches_released: self.batches_released.load(Ordering::Relaxed),
            processing_failures: self.processing_failures.load(Ordering::Relaxed),
            files_created: self.files_created.load(Ordering::Relaxed),
            files_evicted: self.files_evicted.load(Ordering::Relaxed),
            files_expired: self.files_expired.load(Ordering::Relaxed),
            files_drained: self.files_drained.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub bytes_written: u64,
    pub batches_written: u64,
    pub write_failures: u64,
    pub batches_read: u64,
    pub batches_acknowledged: u64,
    pub batches_released: u64,
    pub processing_failures: u64,
    pub files_created: u64,
    pub files_evicted: u64,
    pub files_expired: u64,
    pub files_drained: u64,
}
