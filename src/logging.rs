// 📝 Logging - tracing subscriber setup

use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Per-target levels, e.g. `HIRING_TRENDS_LOG=hiring_trends::source=debug`
pub const LOG_ENV: &str = "HIRING_TRENDS_LOG";

const DEFAULT_FILTER: &str = "hiring_trends=info";

static INIT: Once = Once::new();

/// Install the global subscriber. Safe to call more than once.
///
/// Logs go to stderr; stdout is left to the run summaries.
pub fn init() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}
