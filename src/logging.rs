//! Logging initialisation

use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{PlaybackError, Result};

/// Build the filter directive for a configured level.
fn filter_directive(config: &LoggingConfig) -> String {
    format!("hls_text_renderer={}", config.level)
}

fn build_subscriber(filter: EnvFilter, format: LogFormat) -> Box<dyn Subscriber + Send + Sync> {
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => Box::new(registry.with(tracing_subscriber::fmt::layer())),
        LogFormat::Json => Box::new(registry.with(tracing_subscriber::fmt::layer().json())),
    }
}

/// Initialize logging with tracing.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_directive(config).into());

    build_subscriber(filter, config.format)
        .try_init()
        .map_err(|e| PlaybackError::Config(format!("logging already initialized: {}", e)))
}
