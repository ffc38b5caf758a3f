//! Batch serialization contract
//!
//! The buffer never inspects telemetry. A [`Serializer`] turns a batch of
//! opaque items into one byte payload and back; each payload becomes one
//! frame on disk.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Failure to encode or decode a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SerializationError {
    message: String,
}

impl SerializationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Converts batches of items to bytes and back.
pub trait Serializer: Send + 'static {
    /// Item type carried by a batch.
    type Item;

    /// Encode a batch into a single payload.
    fn serialize(&self, items: &[Self::Item]) -> Result<Vec<u8>, SerializationError>;

    /// Decode a payload produced by [`Serializer::serialize`].
    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<Self::Item>, SerializationError>;
}

/// JSON array encoding for any serde type.
pub struct JsonSerializer<T> {
    _item: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonSerializer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSerializer").finish()
    }
}

impl<T> Serializer for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    type Item = T;

    fn serialize(&self, items: &[T]) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(items).map_err(|e| SerializationError::new(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<T>, SerializationError> {
        serde_json::from_slice(bytes).map_err(|e| SerializationError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct LogLine {
        body: String,
        severity: u8,
    }

    #[test]
    fn test_json_batch_preserves_order() {
        let serializer = JsonSerializer::<LogLine>::new();
        let batch = vec![
            LogLine { body: "first".into(), severity: 5 },
            LogLine { body: "second".into(), severity: 9 },
        ];

        let bytes = serializer.serialize(&batch).unwrap();
        assert_eq!(serializer.deserialize(&bytes).unwrap(), batch);
    }

    #[test]
    fn test_json_rejects_garbage() {
        let serializer = JsonSerializer::<LogLine>::new();
        let err = serializer.deserialize(b"\x00\x01not json").unwrap_err();
        assert!(!err.message().is_empty());
    }
}
