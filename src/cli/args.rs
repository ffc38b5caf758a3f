//! CLI argument definitions using clap
//!
//! Commands:
//! - diskbuffer status --config <path>
//! - diskbuffer write --config <path> --signal <signal>
//! - diskbuffer drain --config <path> --signal <signal> [--max-batches N] [--discard-invalid]
//! - diskbuffer purge --config <path>
//! - diskbuffer clear --config <path> [--signal <signal>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::signal::SignalType;

/// diskbuffer - Inspect and operate an on-disk telemetry buffer
#[derive(Parser, Debug)]
#[command(name = "diskbuffer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show files, sizes and lifecycle states per signal
    Status {
        /// Path to configuration file
        #[arg(long, default_value = "./diskbuffer.json")]
        config: PathBuf,
    },

    /// Buffer one batch read from stdin (one JSON value per line)
    Write {
        /// Path to configuration file
        #[arg(long, default_value = "./diskbuffer.json")]
        config: PathBuf,

        /// Signal folder to write to
        #[arg(long)]
        signal: SignalType,
    },

    /// Print readable batches and acknowledge them
    Drain {
        /// Path to configuration file
        #[arg(long, default_value = "./diskbuffer.json")]
        config: PathBuf,

        /// Signal folder to drain
        #[arg(long)]
        signal: SignalType,

        /// Stop after this many batches
        #[arg(long)]
        max_batches: Option<usize>,

        /// Drop batches that cannot be decoded instead of stopping
        #[arg(long)]
        discard_invalid: bool,
    },

    /// Delete expired files in every signal folder
    Purge {
        /// Path to configuration file
        #[arg(long, default_value = "./diskbuffer.json")]
        config: PathBuf,
    },

    /// Delete every buffered file
    Clear {
        /// Path to configuration file
        #[arg(long, default_value = "./diskbuffer.json")]
        config: PathBuf,

        /// Only clear this signal folder
        #[arg(long)]
        signal: Option<SignalType>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_arguments() {
        let cli = Cli::try_parse_from([
            "diskbuffer",
            "drain",
            "--signal",
            "logs",
            "--max-batches",
            "5",
        ])
        .unwrap();

        match cli.command {
            Command::Drain {
                config,
                signal,
                max_batches,
                discard_invalid,
            } => {
                assert_eq!(config, PathBuf::from("./diskbuffer.json"));
                assert_eq!(signal, SignalType::Logs);
                assert_eq!(max_batches, Some(5));
                assert!(!discard_invalid);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_signal_rejected() {
        assert!(Cli::try_parse_from(["diskbuffer", "write", "--signal", "traces"]).is_err());
    }
}
