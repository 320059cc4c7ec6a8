//! Log output setup for the pulse node.
//!
//! A clock node is judged by its frame cadence, so the log stream leans on
//! structured fields (`frame_number`, `peer_id`, `frame_age_ms`) emitted by
//! the consensus crates rather than prose. This module only decides how
//! those fields are rendered: compact single-line output for a terminal, or
//! flattened JSON for ingestion pipelines.
//!
//! Filter resolution order: `RUST_LOG` when set, then the configured level
//! string (which may carry per-target directives such as
//! `"info,pulse_consensus=debug"`), then plain `info` if neither parses.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Selects the output format for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact single-line output for local development.
    Human,
    /// Flattened newline-delimited JSON for log aggregation pipelines.
    Json,
}

impl LogFormat {
    /// Parse a config value. Anything but `"json"` renders for humans.
    pub fn from_str(value: &str) -> Self {
        match value {
            "json" => Self::Json,
            _ => Self::Human,
        }
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber, reporting failure instead of panicking.
///
/// Fails when a subscriber is already installed, which happens routinely
/// when several nodes are embedded in one test process. Callers that care
/// about the existing logger keep it; everyone else goes through
/// [`init_logging`].
pub fn try_init_logging(format: LogFormat, level: &str) -> Result<(), TryInitError> {
    let filter = build_filter(level);
    match format {
        LogFormat::Human => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true).with_target(true))
            .try_init(),
    }
}

/// Install the global subscriber, keeping any logger that beat us to it.
pub fn init_logging(format: LogFormat, level: &str) {
    if try_init_logging(format, level).is_err() {
        tracing::debug!("a global subscriber is already installed, keeping it");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_json_and_defaults_to_human() {
        assert_eq!(LogFormat::from_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("human"), LogFormat::Human);
        assert_eq!(LogFormat::from_str("anything else"), LogFormat::Human);
    }

    #[test]
    fn second_install_is_reported_not_fatal() {
        // Whichever call wins, the loser must see an error rather than
        // panic, and init_logging must swallow it.
        let _ = try_init_logging(LogFormat::Human, "info");
        assert!(try_init_logging(LogFormat::Human, "info").is_err());
        init_logging(LogFormat::Human, "info");
    }

    #[test]
    fn garbage_level_still_builds_a_filter() {
        // Falls back to "info" rather than erroring out of node startup.
        let _ = build_filter(",,,not a directive,,,");
    }
}
