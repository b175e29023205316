//! Tracing setup for the CLI and server

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` for verisight
/// itself when `verbose` is on. Output goes to stderr so report lines on
/// stdout stay clean.
pub fn init(verbose: bool) {
    let default_filter = if verbose { "warn,verisight=debug" } else { "warn" };
    init_with_filter(default_filter);
}

pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // try_init: a second call (tests, embedding) must not panic
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}
