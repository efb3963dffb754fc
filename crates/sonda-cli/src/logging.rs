//! Log subscriber setup

use tracing_subscriber::EnvFilter;

use crate::commands::LogFormat;
use crate::config::Verbosity;

/// Install the global subscriber on stderr.
///
/// `RUST_LOG` wins over the verbosity level. Calling twice is harmless.
pub fn init(verbosity: Verbosity, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
