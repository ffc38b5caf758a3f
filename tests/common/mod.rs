//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use diskbuffer::clock::ManualClock;
use diskbuffer::config::StorageConfiguration;
use diskbuffer::serialization::{SerializationError, Serializer};
use diskbuffer::signal::SignalType;
use diskbuffer::storage::Storage;
use tempfile::TempDir;

pub const MAX_FILE_AGE_FOR_WRITE_MILLIS: u64 = 1_000;
pub const MIN_FILE_AGE_FOR_READ_MILLIS: u64 = 1_500;
pub const MAX_FILE_AGE_FOR_READ_MILLIS: u64 = 10_000;
pub const MAX_FILE_SIZE: u64 = 2_000;
pub const MAX_FOLDER_SIZE: u64 = 6_000;

pub const START: u64 = 1_700_000_000_000;

/// Passes bytes through untouched; one batch is one payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawBytes;

impl Serializer for RawBytes {
    type Item = u8;

    fn serialize(&self, items: &[u8]) -> Result<Vec<u8>, SerializationError> {
        Ok(items.to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>, SerializationError> {
        Ok(bytes.to_vec())
    }
}

pub fn test_config(temp: &TempDir) -> StorageConfiguration {
    StorageConfiguration::new(
        temp.path(),
        MAX_FILE_AGE_FOR_WRITE_MILLIS,
        MIN_FILE_AGE_FOR_READ_MILLIS,
        MAX_FILE_AGE_FOR_READ_MILLIS,
        MAX_FILE_SIZE,
        MAX_FOLDER_SIZE,
    )
    .unwrap()
}

pub fn open_raw(config: &StorageConfiguration, clock: &Arc<ManualClock>) -> Storage<RawBytes> {
    Storage::open(config.clone(), SignalType::Logs, RawBytes, clock.clone()).unwrap()
}

pub fn file_names(temp: &TempDir, signal: SignalType) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(temp.path().join(signal.folder_name()))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
