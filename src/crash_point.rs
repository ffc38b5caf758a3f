//! Crash point injection for durability testing
//!
//! When `DISKBUFFER_CRASH_POINT` names a point that the code reaches, the
//! process terminates via `std::process::abort()`: no cleanup, no
//! unwinding, no catching. Crash tests run the CLI in a child process with
//! the variable set and then inspect what is left on disk.
//!
//! ```bash
//! DISKBUFFER_CRASH_POINT=cursor_before_rename diskbuffer drain
//! ```

use std::sync::OnceLock;

/// Environment variable naming the active crash point.
pub const CRASH_POINT_ENV: &str = "DISKBUFFER_CRASH_POINT";

static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var(CRASH_POINT_ENV).ok())
        .as_deref()
}

/// Returns true if `DISKBUFFER_CRASH_POINT` equals the given name.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Abort the process if the named crash point is enabled.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    /// Tail copied to the temp file, original not yet replaced
    pub const CURSOR_BEFORE_RENAME: &str = "cursor_before_rename";
    /// Temp file renamed over the original, directory not yet synced
    pub const CURSOR_AFTER_RENAME: &str = "cursor_after_rename";
    /// Frame written to a writable file but not yet synced
    pub const WRITABLE_BEFORE_SYNC: &str = "writable_before_sync";

    /// Get all crash point names
    pub fn all() -> &'static [&'static str] {
        &[CURSOR_BEFORE_RENAME, CURSOR_AFTER_RENAME, WRITABLE_BEFORE_SYNC]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crash_point_disabled_by_default() {
        assert!(!crash_point_enabled("test_point"));
    }

    #[test]
    fn test_all_crash_points_defined() {
        let all = points::all();
        assert_eq!(all.len(), 3);
        assert!(all.contains(&"cursor_before_rename"));
        assert!(all.contains(&"writable_before_sync"));
    }

    #[test]
    fn test_crash_point_names_are_lowercase_with_underscores() {
        for point in points::all() {
            assert!(
                point.chars().all(|c| c.is_lowercase() || c == '_'),
                "Crash point '{}' should be lowercase with underscores",
                point
            );
        }
    }
}
