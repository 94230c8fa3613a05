//! Per-process tracing setup.

// Layer 1: Standard library imports
use std::io;

// Layer 2: Third-party crate imports
use tracing_subscriber::EnvFilter;

// Layer 3: Internal module imports
use crate::settings::Settings;

/// Install the process-wide tracing subscriber from the settings.
///
/// Output goes to stderr: a service child's stdout is reserved for the
/// port-announcement handshake with the supervisor. Calling this twice is
/// harmless (the second call is a no-op).
pub fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_new(settings.log_level.to_lowercase())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    let result = match settings.log_format.as_str() {
        "compact" => builder.compact().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.try_init(),
    };
    // a subscriber may already be installed (tests, embedding applications)
    let _ = result;
}
