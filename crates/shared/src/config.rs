//! Application configuration management.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Invoice generation configuration.
    #[serde(default)]
    pub invoicing: InvoicingConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Overrides for the built-in message catalog.
    #[serde(default)]
    pub messages: Vec<MessageOverride>,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Invoice generation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoicingConfig {
    /// Sweeps are ignored until this instant has passed.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// IANA time zone used to decide which billing period "now" falls in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Seconds between two scheduled sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Whether the scheduler sweeps once immediately after start-up.
    #[serde(default = "default_run_on_start")]
    pub run_on_start: bool,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_sweep_interval() -> u64 {
    86_400 // daily
}

fn default_run_on_start() -> bool {
    true
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            timezone: default_timezone(),
            sweep_interval_secs: default_sweep_interval(),
            run_on_start: default_run_on_start(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
}

/// Replacement text for one message catalog key.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageOverride {
    /// Catalog key, e.g. `payment.receivedBy`.
    pub key: String,
    /// Template with `{0}`-style placeholders.
    pub text: String,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("RADBILL").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
