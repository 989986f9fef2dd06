//! JSON-lines logging for the Lambda binaries.
//!
//! Handlers log through `tracing` with a `component` and an `event` field on
//! every record; CloudWatch receives one JSON object per line.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "info";

pub fn init(component: &'static str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_ansi(false)
        .with_target(false)
        .try_init();

    tracing::info!(component, event = "logging_initialized", "logging initialized");
}
