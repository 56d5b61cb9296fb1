//! Centralised tracing initialisation for the `xdsq` binaries.
//!
//! Call [`init_tracing`] once at program start. Later calls are ignored
//! because the global subscriber can only be set once per process.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "XDSQ_LOG";

/// Build the filter: `XDSQ_LOG`, then `RUST_LOG`, then `level`.
pub fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Initialise the global tracing subscriber.
///
/// * `json` selects newline-delimited JSON output for log pipelines.
/// * Logs go to stderr; stdout is left for command output.
/// * `level` is the default verbosity when no filter variable is set.
pub fn init_tracing(json: bool, level: Level) {
    let filter = env_filter(level);
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().with_target(false).json().with_writer(std::io::stderr))
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // init_tracing itself is not called here: it would claim the global
    // subscriber that #[traced_test] needs.
    #[test]
    fn test_env_filter_builds_with_fallback_level() {
        let filter = env_filter(Level::WARN);
        assert!(!filter.to_string().is_empty());
    }
}
