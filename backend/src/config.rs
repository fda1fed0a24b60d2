//! Configuration management for the multisplit dashboard server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with MULTISPLIT__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::metrics::StockPolicy;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Spreadsheet upload limits
    pub uploads: UploadConfig,

    /// Coverage thresholds for stock filters
    pub stock_policy: StockPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret used to verify bearer tokens issued by the identity provider
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Largest accepted spreadsheet, in bytes
    pub max_bytes: usize,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("MULTISPLIT_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let defaults = StockPolicy::default();

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("uploads.max_bytes", 20 * 1024 * 1024)?
            .set_default("stock_policy.critical_below_days", i64::from(defaults.critical_below_days))?
            .set_default("stock_policy.low_below_days", i64::from(defaults.low_below_days))?
            .set_default("stock_policy.excess_above_days", i64::from(defaults.excess_above_days))?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (MULTISPLIT__ prefix)
            .add_source(
                Environment::with_prefix("MULTISPLIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Config = config.try_deserialize()?;
        shared::validate_stock_policy(&loaded.stock_policy)
            .map_err(|msg| ConfigError::Message(msg.to_string()))?;
        Ok(loaded)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
