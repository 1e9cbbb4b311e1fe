//! Application configuration management.

use serde::Deserialize;

use crate::types::Wei;

/// Smallest value the pool accepts for deposits, reward injections and
/// restakes (exclusive), in wei.
pub const MIN_UNIT_WEI: u64 = 10_000;

/// [`MIN_UNIT_WEI`] as an amount.
#[allow(clippy::cast_lossless)]
pub const MIN_UNIT: Wei = Wei::new(MIN_UNIT_WEI as u128);

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Pool accounting configuration.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Pool accounting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Strict lower bound for deposits, reward injections and restakes, in wei.
    #[serde(default = "default_min_unit_wei")]
    pub min_unit_wei: u64,
}

impl PoolConfig {
    /// Returns the configured threshold as an amount.
    #[must_use]
    pub fn min_unit(&self) -> Wei {
        Wei::new(u128::from(self.min_unit_wei))
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_unit_wei: default_min_unit_wei(),
        }
    }
}

fn default_min_unit_wei() -> u64 {
    MIN_UNIT_WEI
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default `EnvFilter` directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "stakepool=info".to_string()
}

impl AppConfig {
    /// Loads configuration from `.env`, config files and the environment.
    ///
    /// Sources, later ones overriding earlier ones:
    /// `config/default`, `config/{RUN_MODE}`, `STAKEPOOL__*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a source is malformed or a value has the wrong type.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("STAKEPOOL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
