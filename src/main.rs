//! diskbuffer CLI entry point
//!
//! Installs the JSON log subscriber, delegates everything else to
//! `cli::run`, and exits non-zero on failure.

use diskbuffer::cli;
use diskbuffer::observability;

fn main() {
    observability::init_tracing("diskbuffer=warn");

    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
