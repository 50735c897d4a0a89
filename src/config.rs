//! Server configuration loaded from environment variables

use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

pub const BIND_ADDR_VAR: &str = "ROOMRELAY_BIND_ADDR";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const HISTORY_LIMIT_VAR: &str = "ROOMRELAY_HISTORY_LIMIT";
pub const MAX_BODY_LEN_VAR: &str = "ROOMRELAY_MAX_BODY_LEN";
pub const MAX_ROOM_NAME_LEN_VAR: &str = "ROOMRELAY_MAX_ROOM_NAME_LEN";

/// Errors that can occur while loading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration variable has a value that cannot be parsed
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    /// Configuration parsed but is not usable
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// PostgreSQL connection string; messages stay in memory when unset
    pub database_url: Option<String>,
    /// Messages replayed to a participant when it joins a room (0 disables)
    pub history_limit: usize,
    pub max_body_len: usize,
    pub max_room_name_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            history_limit: 50,
            max_body_len: 4096,
            max_room_name_len: 64,
        }
    }
}

impl Config {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through an arbitrary variable lookup; unset
    /// variables fall back to the defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            bind_addr: parse_var(&lookup, BIND_ADDR_VAR)?.unwrap_or(defaults.bind_addr),
            database_url: lookup(DATABASE_URL_VAR).filter(|url| !url.trim().is_empty()),
            history_limit: parse_var(&lookup, HISTORY_LIMIT_VAR)?
                .unwrap_or(defaults.history_limit),
            max_body_len: parse_var(&lookup, MAX_BODY_LEN_VAR)?.unwrap_or(defaults.max_body_len),
            max_room_name_len: parse_var(&lookup, MAX_ROOM_NAME_LEN_VAR)?
                .unwrap_or(defaults.max_room_name_len),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_len == 0 {
            return Err(ConfigError::Validation(format!(
                "{MAX_BODY_LEN_VAR} must be greater than zero"
            )));
        }
        if self.max_room_name_len == 0 {
            return Err(ConfigError::Validation(format!(
                "{MAX_ROOM_NAME_LEN_VAR} must be greater than zero"
            )));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value,
            }),
    }
}
