//! Server configuration parsed from environment variables.
//!
//! `.env` is loaded by `main` before `ServerConfig::from_env` runs, so local
//! runs can keep `DATABASE_URL` in a file.

use crate::state::DEFAULT_WS_CHANNEL_CAPACITY;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Which exercise backend to run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Postgres { database_url: String, max_connections: u32 },
    /// In-process store seeded with the starter exercises. Nothing persists.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub store: StoreKind,
    pub ws_channel_capacity: usize,
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// Optional:
    /// - `EXERCISE_STORE`: `postgres` (default) or `memory`
    /// - `DATABASE_URL`: required when the store is `postgres`
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `PORT`: default 3000
    /// - `WS_CHANNEL_CAPACITY`: default 256
    ///
    /// # Errors
    ///
    /// Returns `Missing` or `Invalid` for the first bad variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `Missing` or `Invalid` for the first bad variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let ws_channel_capacity = parse_or(&lookup, "WS_CHANNEL_CAPACITY", DEFAULT_WS_CHANNEL_CAPACITY)?;
        if ws_channel_capacity == 0 {
            return Err(ConfigError::Invalid { var: "WS_CHANNEL_CAPACITY", value: "0".into() });
        }

        let store = match lookup("EXERCISE_STORE").as_deref().map(str::trim) {
            None | Some("" | "postgres") => {
                let database_url = lookup("DATABASE_URL")
                    .filter(|v| !v.trim().is_empty())
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?;
                let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
                StoreKind::Postgres { database_url, max_connections }
            }
            Some("memory") => StoreKind::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid { var: "EXERCISE_STORE", value: other.to_owned() });
            }
        };

        Ok(Self { port, store, ws_channel_capacity })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
