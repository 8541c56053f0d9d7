//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::errors::{PortalError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the portal REST backend (e.g. http://127.0.0.1:8000/api)
    pub api_base_url: String,
    /// SQLite database backing the client-side key/value store
    pub store_url: String,
    /// Port for the local view API
    pub portal_port: u16,
    /// Upper bound on any single backend request
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            api_base_url: env_var("API_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000/api".to_string())
                .trim_end_matches('/')
                .to_string(),
            store_url: env_var("STORE_URL")
                .unwrap_or_else(|_| "sqlite:./portal_store.db".to_string()),
            portal_port: env_var("PORTAL_PORT")
                .unwrap_or_else(|_| "3002".to_string())
                .parse()
                .map_err(|_| PortalError::Config("Invalid PORTAL_PORT".to_string()))?,
            request_timeout_secs: env_var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| PortalError::Config("Invalid REQUEST_TIMEOUT_SECS".to_string()))?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| PortalError::Config(format!("Missing env var: {key}")))
}
