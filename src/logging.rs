//! Tracing subscriber setup
//!
//! `RUST_LOG`, when set, wins over the configured level.

use crate::errors::BlogClientError;
use config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, BlogClientError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| BlogClientError::Logging(format!("invalid level {:?}: {e}", config.level))),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), BlogClientError> {
    let filter = env_filter(config)?;

    let result = match config.format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
    };

    result.map_err(|e| BlogClientError::Logging(e.to_string()))
}
