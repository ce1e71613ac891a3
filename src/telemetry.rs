//! Logging setup for the `rollcall` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary. Logs go to stderr so stdout stays the data channel.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a stderr `fmt` subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level is `info`, or `debug` with
/// `verbose`. Calling this twice is harmless; the second call is ignored.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
