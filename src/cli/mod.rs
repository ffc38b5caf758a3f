//! CLI module for diskbuffer
//!
//! Provides command-line access to a buffer root directory:
//! - status: files, sizes and lifecycle states per signal
//! - write: buffer one batch from stdin
//! - drain: print and acknowledge readable batches
//! - purge: delete expired files
//! - clear: delete every buffered file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{clear, drain, purge, run, run_command, status, write};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_values, write_error, write_response};
