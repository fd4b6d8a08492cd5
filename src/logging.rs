//! Logging setup
//!
//! Logs go to stderr; stdout is reserved for the accounts CSV. `RUST_LOG`
//! takes precedence over the level passed on the command line.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber
///
/// # Arguments
///
/// * `level` - Filter directive used when `RUST_LOG` is unset (e.g. `info`, `retail_ledger=debug`)
/// * `json` - Emit one JSON object per event instead of human-readable lines
///
/// Calling it twice is harmless: the second subscriber is ignored.
pub fn init(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}
