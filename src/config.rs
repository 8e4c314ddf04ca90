use crate::domain::Decimal;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub db_max_connections: u32,
    /// Smallest amount (whole units) a user may request to withdraw.
    pub min_withdrawal_amount: Decimal,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let db_max_connections = env_map
            .get("DB_MAX_CONNECTIONS")
            .map(|s| s.as_str())
            .unwrap_or("5")
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DB_MAX_CONNECTIONS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let min_withdrawal_amount = env_map
            .get("MIN_WITHDRAWAL_AMOUNT")
            .map(|s| s.as_str())
            .unwrap_or("0")
            .parse::<Decimal>()
            .ok()
            .filter(|d| !d.is_negative() && d.is_whole())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "MIN_WITHDRAWAL_AMOUNT".to_string(),
                    "must be a non-negative whole number".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            db_max_connections,
            min_withdrawal_amount,
        })
    }
}
