//! Logging setup for binaries that embed the mapping layer.
//!
//! The converters log through `tracing`: skipped collection elements at
//! `warn`, unknown computed values at `debug`, payload reconciliation at
//! `trace`. Nothing is printed unless the host installs a subscriber. These
//! helpers install one that writes to **stderr**, since stdout belongs to the
//! host's protocol.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `hemmer_segment_state=debug`)
//!
//! # Examples
//!
//! ```bash
//! # Show skipped rules and labels
//! RUST_LOG=hemmer_segment_state=warn ./provider
//!
//! # Show every conversion step
//! RUST_LOG=hemmer_segment_state=trace ./provider
//! ```

use tracing::Subscriber;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default level when `RUST_LOG` is not set.
pub const DEFAULT_LEVEL: &str = "info";

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG` and falls back to [`DEFAULT_LEVEL`].
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
///
/// ```ignore
/// hemmer_segment_state::init_logging();
/// tracing::info!("provider starting");
/// ```
pub fn init_logging() {
    subscriber(DEFAULT_LEVEL).init();
}

/// Like [`init_logging`], with a custom level for when `RUST_LOG` is unset.
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Try to initialize logging, returning false if a subscriber is already set.
///
/// Safe to call from tests that may run in the same process.
pub fn try_init_logging() -> bool {
    subscriber(DEFAULT_LEVEL).try_init().is_ok()
}

/// Build the filter from `RUST_LOG`, or from `default_level` when unset or invalid.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn subscriber(default_level: &str) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(env_filter(default_level)).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so only the
    // non-panicking entry point is exercised here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("hemmer_segment_state=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_segment_state::convert=trace").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        try_init_logging();
        assert!(!try_init_logging());
        tracing::warn!(target: "hemmer_segment_state", "logging initialized");
    }
}
