use std::env;
use std::net::SocketAddr;

use crate::error::ConfigError;

const DEFAULT_DATABASE_URL: &str = "sqlite://dailyboard.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub webhook_secret: String,
}

impl AppConfig {
    /// Reads configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a local `.env`.
    pub fn new_from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let webhook_secret = env::var("LEMON_SQUEEZY_WEBHOOK_SECRET")
            .map_err(|_| ConfigError::Missing("LEMON_SQUEEZY_WEBHOOK_SECRET"))?;
        if webhook_secret.is_empty() {
            return Err(ConfigError::Invalid {
                name: "LEMON_SQUEEZY_WEBHOOK_SECRET",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            database_url,
            bind_addr,
            webhook_secret,
        })
    }
}
