//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub plan_model: String,
    /// Bound on one generative call. Model latency dominates here, so this
    /// is deliberately much longer than an ordinary request timeout.
    pub generation_timeout_secs: u64,
    /// Daily regeneration ceiling per user.
    pub max_daily_regenerations: i32,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        // --- Load Plan-Generation Settings ---
        let plan_model = std::env::var("PLAN_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let generation_timeout_secs = match std::env::var("GENERATION_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(
                    "GENERATION_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive integer", raw),
                )
            })?,
            Err(_) => 90,
        };

        let max_daily_regenerations = match std::env::var("MAX_DAILY_REGENERATIONS") {
            Ok(raw) => {
                let parsed = raw.parse::<i32>().map_err(|_| {
                    ConfigError::InvalidValue(
                        "MAX_DAILY_REGENERATIONS".to_string(),
                        format!("'{}' is not an integer", raw),
                    )
                })?;
                if parsed < 1 {
                    return Err(ConfigError::InvalidValue(
                        "MAX_DAILY_REGENERATIONS".to_string(),
                        "must be >= 1".to_string(),
                    ));
                }
                parsed
            }
            Err(_) => 3,
        };

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            plan_model,
            generation_timeout_secs,
            max_daily_regenerations,
            cors_origin,
        })
    }
}
