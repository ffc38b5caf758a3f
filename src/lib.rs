//! diskbuffer - disk-backed buffering for telemetry batches
//!
//! Batches of spans, logs or metrics are persisted to local files while a
//! collector is unreachable and replayed once it is back. See [`storage`]
//! for the file lifecycle and delivery guarantees.
//!
//! ```ignore
//! use std::sync::Arc;
//! use diskbuffer::clock::SystemClock;
//! use diskbuffer::config::StorageConfiguration;
//! use diskbuffer::serialization::JsonSerializer;
//! use diskbuffer::signal::SignalType;
//! use diskbuffer::storage::Storage;
//!
//! let config = StorageConfiguration::with_defaults("/var/lib/app/buffer");
//! let mut storage = Storage::open(config, SignalType::Logs, JsonSerializer::<String>::new(), Arc::new(SystemClock))?;
//! storage.write(&["hello".to_string()]);
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod crash_point;
pub mod observability;
pub mod serialization;
pub mod signal;
pub mod storage;
