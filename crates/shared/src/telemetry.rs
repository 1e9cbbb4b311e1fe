//! Tracing subscriber setup for hosts embedding the pool.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;
use crate::error::{AppError, AppResult};

/// Builds the filter: `RUST_LOG` wins, then the configured directive.
#[must_use]
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns `AppError::Internal` if a global subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> AppResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let result = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    result.map_err(|e| AppError::Internal(format!("tracing already initialized: {e}")))
}
