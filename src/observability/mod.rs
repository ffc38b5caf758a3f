//! Observability for the disk buffer
//!
//! Two pieces:
//! - a stable [`Event`] vocabulary, attached as the `event` field of every
//!   lifecycle log line emitted through `tracing`
//! - a [`MetricsRegistry`] of monotonic counters per storage instance
//!
//! The library never installs a subscriber. Binaries call [`init_tracing`]
//! once at startup.
//!
//! ```ignore
//! use diskbuffer::observability::{Event, MetricsRegistry};
//!
//! tracing::info!(event = %Event::FileCreated, path = ?path, "Created buffer file");
//! metrics.increment_files_created();
//! ```

mod events;
mod metrics;

pub use events::Event;
pub use metrics::{MetricsRegistry, MetricsSnapshot};

use tracing_subscriber::EnvFilter;

/// Environment variable read for the log filter.
pub const LOG_ENV: &str = "DISKBUFFER_LOG";

/// Install a JSON subscriber writing to stderr.
///
/// The filter comes from `DISKBUFFER_LOG` (e.g. `diskbuffer=debug`) and
/// falls back to `default_directive`. Calling this twice is harmless; the
/// second installation is ignored.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
