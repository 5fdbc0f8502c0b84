//! Runtime configuration, read once from the environment at startup.

use std::env;

const DEFAULT_DATABASE_URL: &str = "sqlite:ecoledger.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    /// sqlx SQLite URL, e.g. `sqlite:ecoledger.db`.
    pub database_url: String,
    /// Socket address the REST facade listens on.
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("ECOLEDGER_DB").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: env::var("ECOLEDGER_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}
