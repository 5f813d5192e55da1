//! Environment-driven configuration.

use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub season: String,
    pub seed_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/courtedge.db".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            season: "2025-26".to_string(),
            seed_on_start: false,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first so `.env` is honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("COURTEDGE_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "COURTEDGE_PORT",
                value: raw,
            })?,
            None => defaults.port,
        };

        let seed_on_start = match lookup("COURTEDGE_SEED_ON_START") {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidValue {
                key: "COURTEDGE_SEED_ON_START",
                value: raw,
            })?,
            None => defaults.seed_on_start,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            host: lookup("COURTEDGE_HOST").unwrap_or(defaults.host),
            port,
            season: lookup("COURTEDGE_SEASON").unwrap_or(defaults.season),
            seed_on_start,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
