//! Process configuration, loaded once at startup.
//!
//! A missing secret is fatal: the binary refuses to start rather than fall
//! back to a default signing key.

use std::time::Duration;

use thiserror::Error;

use crate::provider::stream::StreamConfig;

pub const DEFAULT_PORT: u16 = 8085;
pub const DEFAULT_STREAM_BASE_URL: &str = "https://chat.stream-io-api.com";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub stream: StreamConfig,
    /// `None` selects the in-memory credential store.
    pub database_url: Option<String>,
    pub migrate_db: bool,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let api_key = non_empty("STREAM_API_KEY").ok_or(ConfigError::Missing("STREAM_API_KEY"))?;
        let api_secret =
            non_empty("STREAM_API_SECRET").ok_or(ConfigError::Missing("STREAM_API_SECRET"))?;

        let port = match non_empty("PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            jwt_secret,
            stream: StreamConfig {
                api_key,
                api_secret,
                base_url: non_empty("STREAM_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_STREAM_BASE_URL.to_string()),
                timeout: Duration::from_secs(10),
            },
            database_url: non_empty("DATABASE_URL"),
            migrate_db: non_empty("MIGRATE_DB").is_some_and(|v| v.eq_ignore_ascii_case("true")),
            port,
        })
    }
}
