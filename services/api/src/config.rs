//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;

use academy_core::domain::{Network, Principal};
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
    /// The fixed administrative principal allowed to create courses/modules
    /// and mint certificates. The service signs those calls itself.
    pub admin_principal: Principal,
    pub network: Network,
    /// How often the mint workflow polls a submitted transaction.
    pub confirmation_poll_interval: Duration,
    /// How long the mint workflow waits for confirmation before giving up.
    pub confirmation_timeout: Duration,
    /// Simulated inclusion delay of the in-process ledger.
    pub confirmation_delay: Duration,
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
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Ledger Settings ---
        let admin_principal_str = std::env::var("ADMIN_PRINCIPAL")
            .map_err(|_| ConfigError::MissingVar("ADMIN_PRINCIPAL".to_string()))?;
        let admin_principal = admin_principal_str.parse::<Principal>().map_err(|e| {
            ConfigError::InvalidValue("ADMIN_PRINCIPAL".to_string(), e.to_string())
        })?;

        let network_str =
            std::env::var("STACKS_NETWORK").unwrap_or_else(|_| "testnet".to_string());
        let network = network_str
            .parse::<Network>()
            .map_err(|e| ConfigError::InvalidValue("STACKS_NETWORK".to_string(), e))?;

        // --- Load Confirmation-polling Settings ---
        let confirmation_poll_interval =
            Duration::from_millis(parse_millis("CONFIRMATION_POLL_MS", 500)?);
        let confirmation_timeout =
            Duration::from_millis(parse_millis("CONFIRMATION_TIMEOUT_MS", 30_000)?);
        let confirmation_delay =
            Duration::from_millis(parse_millis("CONFIRMATION_DELAY_MS", 2_000)?);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            admin_principal,
            network,
            confirmation_poll_interval,
            confirmation_timeout,
            confirmation_delay,
        })
    }
}

fn parse_millis(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
