//! Async facade tests
//!
//! Producers and a consumer share one storage through cloned handles; every
//! call runs on the blocking pool and never panics across the await.

mod common;

use std::sync::Arc;

use common::*;
use diskbuffer::clock::ManualClock;
use diskbuffer::storage::{ProcessResult, ReadableResult, SharedStorage};
use tempfile::TempDir;

fn shared(temp: &TempDir, clock: &Arc<ManualClock>) -> SharedStorage<RawBytes> {
    SharedStorage::new(open_raw(&test_config(temp), clock))
}

#[tokio::test]
async fn test_concurrent_producers_single_consumer() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(START));
    let storage = shared(&temp, &clock);

    let producers: Vec<_> = (0..8u8)
        .map(|i| {
            let storage = storage.clone();
            tokio::spawn(async move { storage.write(vec![i; 16]).await.is_success() })
        })
        .collect();
    for producer in producers {
        assert!(producer.await.unwrap());
    }

    clock.advance(MIN_FILE_AGE_FOR_READ_MILLIS);

    let mut markers = Vec::new();
    loop {
        let consumer = storage.clone();
        let result = consumer
            .read_and_process(|items| {
                assert_eq!(items.len(), 16);
                ProcessResult::Succeeded
            })
            .await;
        if result != ReadableResult::Succeeded {
            assert_eq!(result, ReadableResult::NoContentAvailable);
            break;
        }
        markers.push(());
    }

    assert_eq!(markers.len(), 8);
    assert_eq!(storage.metrics().await.unwrap().batches_acknowledged, 8);
}

#[tokio::test]
async fn test_released_batch_returned_by_next_read() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(START));
    let storage = shared(&temp, &clock);

    storage.write(b"again".to_vec()).await;
    clock.advance(MIN_FILE_AGE_FOR_READ_MILLIS);

    let first = storage.read().await.into_batch().unwrap();
    storage.release(first.receipt).await.unwrap();

    let second = storage.read().await.into_batch().unwrap();
    assert_eq!(second.items, first.items);
    assert_eq!(second.receipt, first.receipt);
}

#[tokio::test]
async fn test_clear_empties_folder() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(START));
    let storage = shared(&temp, &clock);

    storage.write(b"x".to_vec()).await;
    clock.advance(MAX_FILE_AGE_FOR_WRITE_MILLIS);
    storage.write(b"y".to_vec()).await;

    assert_eq!(storage.clear().await.unwrap(), 2);

    clock.advance(MIN_FILE_AGE_FOR_READ_MILLIS);
    assert_eq!(storage.read().await.status(), ReadableResult::NoContentAvailable);
}
