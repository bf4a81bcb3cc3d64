//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Environment variable overriding the configured filter.
pub const LOG_ENV: &str = "PKBQL_LOG";

/// Installs a stderr `fmt` subscriber. `PKBQL_LOG` wins over `filter`.
/// Later calls, or a subscriber installed elsewhere, leave the existing
/// one in place.
pub fn init_tracing(filter: &str) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(filter));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

/// Installs the subscriber using `config.logging.filter`.
pub fn init_from_config(config: &Config) {
    init_tracing(&config.logging.filter);
}
