//! Logging utilities

use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize the global logging system
///
/// `RUST_LOG` wins when set; otherwise `AUGUR_LOG_LEVEL`, then `default_level`.
/// Subsequent calls are ignored.
pub fn init_logging(default_level: &str) {
    INIT.call_once(|| {
        let level = std::env::var("AUGUR_LOG_LEVEL").unwrap_or_else(|_| default_level.to_string());
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

        let result = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init();

        if result.is_err() {
            tracing::debug!("Global subscriber already installed; keeping existing one");
        }
    });
}
