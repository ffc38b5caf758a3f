//! Async handle over a [`Storage`]
//!
//! File I/O blocks, so every call runs on tokio's blocking pool behind a
//! mutex. The handle is cheap to clone; producers and the consumer loop can
//! each hold one. Dropping a returned future does not interrupt the
//! operation already handed to the pool.

use std::sync::{Arc, Mutex};

use tracing::warn;

use super::errors::{BufferError, BufferResult};
use super::facade::Storage;
use super::result::{
    ProcessResult, ProcessingFailure, ReadOperation, ReadableResult, Receipt, WriteResult,
};
use crate::observability::MetricsSnapshot;
use crate::serialization::Serializer;

/// Cloneable async facade. Failures come back as values, never panics.
pub struct SharedStorage<S: Serializer> {
    inner: Arc<Mutex<Storage<S>>>,
}

impl<S: Serializer> Clone for SharedStorage<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> SharedStorage<S>
where
    S: Serializer,
    S::Item: Send + 'static,
{
    pub fn new(storage: Storage<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(storage)),
        }
    }

    async fn run<R, F>(&self, op: F) -> BufferResult<R>
    where
        F: FnOnce(&mut Storage<S>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut storage = inner
                .lock()
                .map_err(|_| BufferError::TaskFailed("storage lock poisoned".to_string()))?;
            Ok(op(&mut storage))
        })
        .await
        .map_err(|e| BufferError::TaskFailed(e.to_string()))?
    }

    pub async fn write(&self, items: Vec<S::Item>) -> WriteResult {
        match self.run(move |storage| storage.write(&items)).await {
            Ok(result) => result,
            Err(e) => WriteResult::Failed { cause: Some(e) },
        }
    }

    pub async fn read(&self) -> ReadOperation<S::Item> {
        match self.run(|storage| storage.read()).await {
            Ok(operation) => operation,
            Err(e) => ReadOperation::ProcessingFailed(ProcessingFailure {
                cause: e,
                receipt: None,
            }),
        }
    }

    /// See [`Storage::read_and_process`]. `process` runs on the blocking
    /// pool while the storage lock is held.
    pub async fn read_and_process<F>(&self, process: F) -> ReadableResult
    where
        F: FnOnce(&[S::Item]) -> ProcessResult + Send + 'static,
    {
        self.run(move |storage| storage.read_and_process(process))
            .await
            .unwrap_or(ReadableResult::ProcessingFailed)
    }

    pub async fn acknowledge(&self, receipt: Receipt) -> BufferResult<()> {
        self.run(move |storage| storage.acknowledge(receipt)).await?
    }

    pub async fn release(&self, receipt: Receipt) -> BufferResult<()> {
        self.run(move |storage| storage.release(receipt)).await?
    }

    pub async fn clear(&self) -> BufferResult<usize> {
        self.run(|storage| storage.clear()).await?
    }

    pub async fn metrics(&self) -> BufferResult<MetricsSnapshot> {
        self.run(|storage| storage.metrics()).await
    }

    pub async fn close(&self) {
        if let Err(e) = self.run(|storage| storage.close()).await {
            // A poisoned lock means a panic already tore the storage down.
            warn!(code = e.code(), error = %e, "Failed to close storage");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::StorageConfiguration;
    use crate::serialization::JsonSerializer;
    use crate::signal::SignalType;
    use tempfile::TempDir;

    fn shared(temp: &TempDir, clock: Arc<ManualClock>) -> SharedStorage<JsonSerializer<u64>> {
        let config =
            StorageConfiguration::new(temp.path(), 1_000, 1_500, 10_000, 2_000, 6_000).unwrap();
        let storage = Storage::open(config, SignalType::Metrics, JsonSerializer::new(), clock).unwrap();
        SharedStorage::new(storage)
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(50_000));
        let storage = shared(&temp, clock.clone());

        assert!(storage.write(vec![1, 2, 3]).await.is_success());
        clock.advance(1_500);

        let batch = storage.read().await.into_batch().unwrap();
        assert_eq!(batch.items, vec![1, 2, 3]);
        storage.acknowledge(batch.receipt).await.unwrap();

        assert_eq!(storage.read().await.status(), ReadableResult::NoContentAvailable);
        assert_eq!(storage.metrics().await.unwrap().batches_acknowledged, 1);
    }

    #[tokio::test]
    async fn test_clones_share_one_storage() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(50_000));
        let producer = shared(&temp, clock.clone());
        let consumer = producer.clone();

        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let producer = producer.clone();
                tokio::spawn(async move { producer.write(vec![i]).await.is_success() })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        clock.advance(1_500);

        let mut seen = Vec::new();
        for _ in 0..4 {
            let batch = consumer.read().await.into_batch().unwrap();
            seen.extend(batch.items.iter().copied());
            consumer.acknowledge(batch.receipt).await.unwrap();
        }
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_close_after_panic_reports_task_failure() {
        let temp = TempDir::new().unwrap();
        let storage = shared(&temp, Arc::new(ManualClock::new(50_000)));

        let panicked = storage
            .run::<(), _>(|_| panic!("consumer bug"))
            .await;
        assert!(matches!(panicked, Err(BufferError::TaskFailed(_))));

        // The lock is poisoned now; close logs and returns.
        storage.close().await;
        assert!(matches!(
            storage.acknowledge(Receipt { file_id: 1, frame_len: 1 }).await,
            Err(BufferError::TaskFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_storage_reports_closed() {
        let temp = TempDir::new().unwrap();
        let storage = shared(&temp, Arc::new(ManualClock::new(50_000)));

        storage.close().await;

        assert_eq!(storage.read().await.status(), ReadableResult::Closed);
        assert!(!storage.write(vec![7]).await.is_success());
    }
}
