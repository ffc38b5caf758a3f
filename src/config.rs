//! Storage configuration
//!
//! The retention policy is fixed for the lifetime of a storage instance:
//!
//! - `max_file_age_for_write_millis`: a file stops accepting writes after this age
//! - `min_file_age_for_read_millis`: a file may not be read before this age
//! - `max_file_age_for_read_millis`: a file older than this is purged unread
//! - `max_file_size`: byte cap per file
//! - `max_folder_size`: byte cap per signal folder
//!
//! The read window always opens strictly after the write window closes, so a
//! file can never be selected for writing and for reading at the same time.
//! Construction rejects any configuration that breaks this ordering.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::{BufferError, BufferResult};

/// Default write window: 30 seconds
pub const DEFAULT_MAX_FILE_AGE_FOR_WRITE_MILLIS: u64 = 30_000;
/// Default read delay: 33 seconds
pub const DEFAULT_MIN_FILE_AGE_FOR_READ_MILLIS: u64 = 33_000;
/// Default expiry: 18 hours
pub const DEFAULT_MAX_FILE_AGE_FOR_READ_MILLIS: u64 = 18 * 60 * 60 * 1000;
/// Default file cap: 1 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
/// Default folder cap: 10 MiB
pub const DEFAULT_MAX_FOLDER_SIZE: u64 = 10 * 1024 * 1024;

/// Immutable, validated storage policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageConfiguration {
    root_dir: PathBuf,
    max_file_age_for_write_millis: u64,
    min_file_age_for_read_millis: u64,
    max_file_age_for_read_millis: u64,
    max_file_size: u64,
    max_folder_size: u64,
}

impl StorageConfiguration {
    /// Build a configuration, validating every cross-field constraint.
    ///
    /// # Errors
    ///
    /// Returns `BufferError::InvalidConfiguration` if any value is zero,
    /// if the read window does not open strictly after the write window,
    /// if expiry is not after the read delay, or if the folder cap is
    /// smaller than the file cap.
    pub fn new(
        root_dir: impl Into<PathBuf>,
        max_file_age_for_write_millis: u64,
        min_file_age_for_read_millis: u64,
        max_file_age_for_read_millis: u64,
        max_file_size: u64,
        max_folder_size: u64,
    ) -> BufferResult<Self> {
        let config = Self {
            root_dir: root_dir.into(),
            max_file_age_for_write_millis,
            min_file_age_for_read_millis,
            max_file_age_for_read_millis,
            max_file_size,
            max_folder_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Default policy rooted at `root_dir`.
    pub fn with_defaults(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            max_file_age_for_write_millis: DEFAULT_MAX_FILE_AGE_FOR_WRITE_MILLIS,
            min_file_age_for_read_millis: DEFAULT_MIN_FILE_AGE_FOR_READ_MILLIS,
            max_file_age_for_read_millis: DEFAULT_MAX_FILE_AGE_FOR_READ_MILLIS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_folder_size: DEFAULT_MAX_FOLDER_SIZE,
        }
    }

    fn validate(&self) -> BufferResult<()> {
        let positive = [
            ("max_file_age_for_write_millis", self.max_file_age_for_write_millis),
            ("min_file_age_for_read_millis", self.min_file_age_for_read_millis),
            ("max_file_age_for_read_millis", self.max_file_age_for_read_millis),
            ("max_file_size", self.max_file_size),
            ("max_folder_size", self.max_folder_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(BufferError::InvalidConfiguration(format!(
                    "{} must be > 0",
                    name
                )));
            }
        }

        if self.min_file_age_for_read_millis <= self.max_file_age_for_write_millis {
            return Err(BufferError::InvalidConfiguration(format!(
                "min_file_age_for_read_millis ({}) must be greater than max_file_age_for_write_millis ({})",
                self.min_file_age_for_read_millis, self.max_file_age_for_write_millis
            )));
        }

        if self.max_file_age_for_read_millis <= self.min_file_age_for_read_millis {
            return Err(BufferError::InvalidConfiguration(format!(
                "max_file_age_for_read_millis ({}) must be greater than min_file_age_for_read_millis ({})",
                self.max_file_age_for_read_millis, self.min_file_age_for_read_millis
            )));
        }

        if self.max_folder_size < self.max_file_size {
            return Err(BufferError::InvalidConfiguration(format!(
                "max_folder_size ({}) must be at least max_file_size ({})",
                self.max_folder_size, self.max_file_size
            )));
        }

        Ok(())
    }

    /// Base directory holding one subdirectory per signal type.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn max_file_age_for_write_millis(&self) -> u64 {
        self.max_file_age_for_write_millis
    }

    pub fn min_file_age_for_read_millis(&self) -> u64 {
        self.min_file_age_for_read_millis
    }

    pub fn max_file_age_for_read_millis(&self) -> u64 {
        self.max_file_age_for_read_millis
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn max_folder_size(&self) -> u64 {
        self.max_folder_size
    }
}

/// On-disk configuration file (JSON).
///
/// Only `root_dir` is required; every other field falls back to the
/// library defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Root directory for buffered signals (required)
    pub root_dir: PathBuf,

    #[serde(default = "default_max_file_age_for_write")]
    pub max_file_age_for_write_millis: u64,

    #[serde(default = "default_min_file_age_for_read")]
    pub min_file_age_for_read_millis: u64,

    #[serde(default = "default_max_file_age_for_read")]
    pub max_file_age_for_read_millis: u64,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default = "default_max_folder_size")]
    pub max_folder_size: u64,
}

fn default_max_file_age_for_write() -> u64 {
    DEFAULT_MAX_FILE_AGE_FOR_WRITE_MILLIS
}
fn default_min_file_age_for_read() -> u64 {
    DEFAULT_MIN_FILE_AGE_FOR_READ_MILLIS
}
fn default_max_file_age_for_read() -> u64 {
    DEFAULT_MAX_FILE_AGE_FOR_READ_MILLIS
}
fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}
fn default_max_folder_size() -> u64 {
    DEFAULT_MAX_FOLDER_SIZE
}

impl ConfigFile {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> BufferResult<StorageConfiguration> {
        let content = fs::read_to_string(path).map_err(|e| {
            BufferError::io(format!("Failed to read config: {}", path.display()), e)
        })?;

        let file: ConfigFile = serde_json::from_str(&content).map_err(|e| {
            BufferError::InvalidConfiguration(format!("Invalid config JSON: {}", e))
        })?;

        file.into_configuration()
    }

    /// Validate into a [`StorageConfiguration`].
    pub fn into_configuration(self) -> BufferResult<StorageConfiguration> {
        StorageConfiguration::new(
            self.root_dir,
            self.max_file_age_for_write_millis,
            self.min_file_age_for_read_millis,
            self.max_file_age_for_read_millis,
            self.max_file_size,
            self.max_folder_size,
        )
    }
}
