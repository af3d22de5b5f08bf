//! Structured logging setup.
//!
//! Logs go to stderr so stdout stays clean for the humanized text.
//! `RUST_LOG` takes precedence over the verbosity flag.

use tracing_subscriber::{EnvFilter, fmt};

/// Map a `-v` count to a filter directive (0 = warn, 1 = info, 2 = debug, 3+ = trace).
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .init();
}
