//! CLI command implementations
//!
//! Every command loads the configuration file, opens the signal folders it
//! needs with the system clock, does its work, and prints one JSON response.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigFile, StorageConfiguration};
use crate::serialization::JsonSerializer;
use crate::signal::SignalType;
use crate::storage::{ReadOperation, Storage, WriteResult};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_values, write_error, write_partial, write_response};

type JsonStorage = Storage<JsonSerializer<Value>>;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command. Failures
/// are also reported as a JSON error object on stdout.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let result = run_command(cli.command, stdin.lock(), &mut stdout);
    if let Err(ref e) = result {
        if !e.is_reported() {
            let _ = write_error(&mut stdout, e.code_str(), e.message());
        }
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command, input: impl BufRead, out: &mut dyn Write) -> CliResult<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    match cmd {
        Command::Status { config } => status(&config, clock, out),
        Command::Write { config, signal } => write(&config, signal, clock, input, out),
        Command::Drain {
            config,
            signal,
            max_batches,
            discard_invalid,
        } => drain(&config, signal, max_batches, discard_invalid, clock, out),
        Command::Purge { config } => purge(&config, clock, out),
        Command::Clear { config, signal } => clear(&config, signal, clock, out),
    }
}

fn open(config: &StorageConfiguration, signal: SignalType, clock: &Arc<dyn Clock>) -> CliResult<JsonStorage> {
    Ok(Storage::open(
        config.clone(),
        signal,
        JsonSerializer::new(),
        Arc::clone(clock),
    )?)
}

fn load(config_path: &Path) -> CliResult<StorageConfiguration> {
    ConfigFile::load(config_path).map_err(|e| CliError::config_error(e.to_string()))
}

/// Report files, sizes and lifecycle states for every signal folder.
pub fn status(config_path: &Path, clock: Arc<dyn Clock>, out: &mut dyn Write) -> CliResult<()> {
    let config = load(config_path)?;

    let mut signals = Map::new();
    for signal in SignalType::ALL {
        let storage = open(&config, signal, &clock)?;
        let states = storage.folder().file_states()?;

        let total_size: u64 = states.iter().map(|(file, _)| file.size).sum();
        let files: Vec<Value> = states
            .into_iter()
            .map(|(file, state)| {
                json!({
                    "created_millis": file.created_millis,
                    "size": file.size,
                    "state": state,
                })
            })
            .collect();

        signals.insert(
            signal.folder_name().to_string(),
            json!({
                "file_count": files.len(),
                "total_size": total_size,
                "max_folder_size": config.max_folder_size(),
                "files": files,
            }),
        );
    }

    write_response(out, json!({ "root_dir": config.root_dir(), "signals": signals }))
}

/// Buffer every JSON value read from `input` as one batch.
pub fn write(
    config_path: &Path,
    signal: SignalType,
    clock: Arc<dyn Clock>,
    input: impl BufRead,
    out: &mut dyn Write,
) -> CliResult<()> {
    let config = load(config_path)?;
    let items = read_values(input)?;
    let mut storage = open(&config, signal, &clock)?;

    match storage.write(&items) {
        WriteResult::Succeeded => {
            write_response(out, json!({ "signal": signal, "written": items.len() }))
        }
        WriteResult::Failed { cause: Some(e) } => Err(CliError::write_failed(e.to_string())),
        WriteResult::Failed { cause: None } => {
            Err(CliError::write_failed("No writable file accepted the batch"))
        }
    }
}

/// Read, print and acknowledge readable batches.
///
/// Stops when nothing is readable, after `max_batches`, or at the first
/// undecodable batch unless `discard_invalid` is set. On failure the
/// batches drained so far are printed with the error.
pub fn drain(
    config_path: &Path,
    signal: SignalType,
    max_batches: Option<usize>,
    discard_invalid: bool,
    clock: Arc<dyn Clock>,
    out: &mut dyn Write,
) -> CliResult<()> {
    let config = load(config_path)?;
    let mut storage = open(&config, signal, &clock)?;

    let mut batches = Vec::new();
    let mut discarded = 0usize;
    let mut expired_files = 0usize;
    // Acknowledged batches are gone from disk; a failure part way through
    // still prints every batch read so far.
    let mut stopped: Option<CliError> = None;

    while max_batches.map_or(true, |max| batches.len() < max) {
        match storage.read() {
            ReadOperation::Succeeded(batch) => {
                // Printed even if the acknowledgement fails: a duplicate
                // beats a batch lost after a half-done truncation.
                batches.push(json!({
                    "file_id": batch.receipt.file_id,
                    "items": batch.items,
                }));
                if let Err(e) = storage.acknowledge(batch.receipt) {
                    stopped = Some(e.into());
                    break;
                }
            }
            ReadOperation::FileHasExpired => expired_files += 1,
            ReadOperation::ProcessingFailed(failure) => match failure.receipt {
                Some(receipt) if discard_invalid => {
                    if let Err(e) = storage.acknowledge(receipt) {
                        stopped = Some(e.into());
                        break;
                    }
                    discarded += 1;
                }
                _ => {
                    stopped = Some(CliError::read_failed(failure.cause.to_string()));
                    break;
                }
            },
            ReadOperation::NoContentAvailable | ReadOperation::Closed => break,
        }
    }

    let data = json!({
        "signal": signal,
        "drained": batches.len(),
        "discarded": discarded,
        "expired_files": expired_files,
        "batches": batches,
    });
    match stopped {
        None => write_response(out, data),
        Some(e) => {
            write_partial(out, e.code_str(), e.message(), data)?;
            Err(e.reported())
        }
    }
}

/// Delete expired files in every signal folder.
pub fn purge(config_path: &Path, clock: Arc<dyn Clock>, out: &mut dyn Write) -> CliResult<()> {
    let config = load(config_path)?;

    let mut purged = Map::new();
    for signal in SignalType::ALL {
        let mut storage = open(&config, signal, &clock)?;
        purged.insert(signal.folder_name().to_string(), json!(storage.purge_expired()?));
    }

    write_response(out, json!({ "purged": purged }))
}

/// Delete every buffered file of one or all signal folders.
pub fn clear(
    config_path: &Path,
    signal: Option<SignalType>,
    clock: Arc<dyn Clock>,
    out: &mut dyn Write,
) -> CliResult<()> {
    let config = load(config_path)?;
    let signals = match signal {
        Some(signal) => vec![signal],
        None => SignalType::ALL.to_vec(),
    };

    let mut cleared = Map::new();
    for signal in signals {
        let mut storage = open(&config, signal, &clock)?;
        cleared.insert(signal.folder_name().to_string(), json!(storage.clear()?));
    }

    write_response(out, json!({ "cleared": cleared }))
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use crate::clock::ManualClock;
    use std::fs;
    use tempfile::TempDir;

    const START: u64 = 1_700_000_000_000;

    fn create_config(temp_dir: &TempDir) -> std::path::PathBuf {
        let config_path = temp_dir.path().join("diskbuffer.json");
        let config = json!({
            "root_dir": temp_dir.path().join("buffer"),
            "max_file_age_for_write_millis": 1000,
            "min_file_age_for_read_millis": 1500,
            "max_file_age_for_read_millis": 10000,
        });
        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    fn response(out: &[u8]) -> Value {
        serde_json::from_slice(out).unwrap()
    }

    #[test]
    fn test_write_then_drain() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        let clock = Arc::new(ManualClock::new(START));

        let mut out = Vec::new();
        let input = b"{\"body\":\"a\"}\n{\"body\":\"b\"}\n" as &[u8];
        write(&config_path, SignalType::Logs, clock.clone(), input, &mut out).unwrap();
        assert_eq!(response(&out)["data"]["written"], 2);

        clock.advance(1_500);
        let mut out = Vec::new();
        drain(&config_path, SignalType::Logs, None, false, clock, &mut out).unwrap();

        let data = &response(&out)["data"];
        assert_eq!(data["drained"], 1);
        assert_eq!(data["batches"][0]["items"][1]["body"], "b");
    }

    #[test]
    fn test_drain_respects_max_batches() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        let clock = Arc::new(ManualClock::new(START));

        for line in ["1\n", "2\n", "3\n"] {
            let mut out = Vec::new();
            write(&config_path, SignalType::Spans, clock.clone(), line.as_bytes(), &mut out)
                .unwrap();
        }

        // Three short-lived files; the newest is named START + 2.
        clock.advance(1_600);
        let mut out = Vec::new();
        drain(&config_path, SignalType::Spans, Some(2), false, clock.clone(), &mut out).unwrap();
        assert_eq!(response(&out)["data"]["drained"], 2);

        let mut out = Vec::new();
        drain(&config_path, SignalType::Spans, None, false, clock, &mut out).unwrap();
        assert_eq!(response(&out)["data"]["batches"][0]["items"][0], 3);
    }

    #[test]
    fn test_drain_failure_still_prints_drained_batches() {
        use crate::storage::encode_frame;
        use std::io::Write as _;

        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        let clock = Arc::new(ManualClock::new(START));

        let mut out = Vec::new();
        write(&config_path, SignalType::Logs, clock.clone(), b"\"precious\"\n" as &[u8], &mut out)
            .unwrap();

        let path = temp_dir.path().join("buffer/logs").join(START.to_string());
        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&encode_frame(b"not json")).unwrap();
        drop(file);

        clock.advance(1_500);
        let mut out = Vec::new();
        let err = drain(&config_path, SignalType::Logs, None, false, clock, &mut out).unwrap_err();

        assert_eq!(err.code(), &CliErrorCode::ReadFailed);
        assert!(err.is_reported());

        let printed = response(&out);
        assert_eq!(printed["status"], "error");
        assert_eq!(printed["data"]["drained"], 1);
        assert_eq!(printed["data"]["batches"][0]["items"][0], "precious");

        // The undecodable frame is still on disk.
        assert_eq!(fs::read(&path).unwrap(), encode_frame(b"not json"));
    }

    #[test]
    fn test_status_reports_every_signal() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        let clock = Arc::new(ManualClock::new(START));

        let mut out = Vec::new();
        write(&config_path, SignalType::Metrics, clock.clone(), b"42\n" as &[u8], &mut out)
            .unwrap();

        let mut out = Vec::new();
        status(&config_path, clock, &mut out).unwrap();

        let signals = &response(&out)["data"]["signals"];
        assert_eq!(signals["metrics"]["file_count"], 1);
        assert_eq!(signals["logs"]["file_count"], 0);
        assert_eq!(signals["spans"]["file_count"], 0);
    }

    #[test]
    fn test_clear_single_signal() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        let clock = Arc::new(ManualClock::new(START));

        for signal in [SignalType::Logs, SignalType::Spans] {
            let mut out = Vec::new();
            write(&config_path, signal, clock.clone(), b"1\n" as &[u8], &mut out).unwrap();
        }

        let mut out = Vec::new();
        clear(&config_path, Some(SignalType::Logs), clock, &mut out).unwrap();

        assert_eq!(response(&out)["data"]["cleared"]["logs"], 1);
        assert!(temp_dir.path().join("buffer/spans").read_dir().unwrap().next().is_some());
    }

    #[test]
    fn test_purge_counts_expired_files() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        let clock = Arc::new(ManualClock::new(START));

        let mut out = Vec::new();
        write(&config_path, SignalType::Logs, clock.clone(), b"1\n" as &[u8], &mut out).unwrap();

        clock.advance(10_000);
        let mut out = Vec::new();
        purge(&config_path, clock, &mut out).unwrap();

        assert_eq!(response(&out)["data"]["purged"]["logs"], 1);
    }

    #[test]
    fn test_empty_write_input_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let mut out = Vec::new();
        let err = write(
            &config_path,
            SignalType::Logs,
            Arc::new(ManualClock::new(START)),
            b"" as &[u8],
            &mut out,
        )
        .unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::InvalidInput);
    }

    #[test]
    fn test_missing_config_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut out = Vec::new();
        let err = status(
            &temp_dir.path().join("missing.json"),
            Arc::new(SystemClock),
            &mut out,
        )
        .unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }
}
