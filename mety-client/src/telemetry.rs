//! Tracing subscriber setup.

use crate::config::{LogConfig, LogFormat};
use crate::error::ClientError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "mety_client=info,warn";

/// Install the global subscriber. Logs go to stderr so command output stays clean.
pub fn init_tracing(config: &LogConfig) -> Result<(), ClientError> {
    let env_filter = match &config.filter {
        Some(filter) => EnvFilter::try_new(filter).map_err(|e| ClientError::Telemetry(e.to_string()))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    let json = config.format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .try_init()
        .map_err(|e| ClientError::Telemetry(e.to_string()))
}
