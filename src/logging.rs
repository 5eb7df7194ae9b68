//! Diagnostic logging to stderr.
//!
//! `RUST_LOG` wins when set. Otherwise only warnings are shown, or debug
//! output for this crate with `--verbose`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn init(verbose: bool) {
    let default = if verbose { "birdspot=debug" } else { "birdspot=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests, embedding) is harmless, so the error is dropped.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
