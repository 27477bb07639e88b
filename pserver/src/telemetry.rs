//! Tracing subscriber setup for the server binary.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingSection};
use crate::error::ServerError;

/// `RUST_LOG` wins over the configured level.
pub fn env_filter(logging: &LoggingSection) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},tower_http={level}",
            level = logging.level
        ))
    })
}

pub fn init_tracing(logging: &LoggingSection) -> Result<(), ServerError> {
    let registry = tracing_subscriber::registry().with(env_filter(logging));
    let result = match logging.format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
    };
    result.map_err(|err| ServerError::Telemetry(err.to_string()))
}
