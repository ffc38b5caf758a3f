//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code.

use std::fmt;
use std::io;

use crate::storage::BufferError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing or invalid
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Malformed or empty input
    InvalidInput,
    /// Batch could not be buffered
    WriteFailed,
    /// Batch could not be read or settled
    ReadFailed,
    /// Storage operation failed
    StorageError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "DISKBUFFER_CLI_CONFIG_ERROR",
            Self::IoError => "DISKBUFFER_CLI_IO_ERROR",
            Self::InvalidInput => "DISKBUFFER_CLI_INVALID_INPUT",
            Self::WriteFailed => "DISKBUFFER_CLI_WRITE_FAILED",
            Self::ReadFailed => "DISKBUFFER_CLI_READ_FAILED",
            Self::StorageError => "DISKBUFFER_CLI_STORAGE_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
    reported: bool,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            reported: false,
        }
    }

    /// Mark the error as already written to stdout.
    pub fn reported(mut self) -> Self {
        self.reported = true;
        self
    }

    pub fn is_reported(&self) -> bool {
        self.reported
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::WriteFailed, msg)
    }

    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ReadFailed, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON error: {}", e))
    }
}

impl From<BufferError> for CliError {
    fn from(e: BufferError) -> Self {
        let code = match e {
            BufferError::InvalidConfiguration(_) => CliErrorCode::ConfigError,
            _ => CliErrorCode::StorageError,
        };
        Self::new(code, format!("{} ({})", e, e.code()))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_maps_to_config_error() {
        let err: CliError = BufferError::InvalidConfiguration("bad".into()).into();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
        assert!(err.message().contains("DISKBUFFER_INVALID_CONFIGURATION"));
    }

    #[test]
    fn test_display_includes_code() {
        let err = CliError::invalid_input("Empty input");
        assert_eq!(err.to_string(), "DISKBUFFER_CLI_INVALID_INPUT: Empty input");
    }
}
