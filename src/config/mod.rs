//! Configuration module for the threat dashboard.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::errors::AppError;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the upstream analytics API, without trailing slash
    pub api_base_url: String,
    /// Address to bind the dashboard server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Pre-shared key guarding the admin pipeline triggers
    pub admin_psk: Option<String>,
    /// Optional timeout for upstream requests
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_base_url = normalize_base_url(
            &env::var("DASH_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
        );

        let bind_addr = env::var("DASH_BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid DASH_BIND_ADDR: {}", e)))?;

        let log_level = env::var("DASH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let admin_psk = env::var("DASH_ADMIN_PSK").ok().filter(|s| !s.is_empty());

        let request_timeout = match env::var("DASH_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    AppError::Config(format!("Invalid DASH_REQUEST_TIMEOUT_SECS: {}", raw))
                })?;
                Some(Duration::from_secs(secs))
            }
            Err(_) => None,
        };

        Ok(Self {
            api_base_url,
            bind_addr,
            log_level,
            admin_psk,
            request_timeout,
        })
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        env::remove_var("DASH_API_BASE_URL");
        env::remove_var("DASH_BIND_ADDR");
        env::remove_var("DASH_LOG_LEVEL");
        env::remove_var("DASH_ADMIN_PSK");
        env::remove_var("DASH_REQUEST_TIMEOUT_SECS");

        let config = Config::from_env().unwrap();

        assert_eq!(config.api_base_url, "http://127.0.0.1:8000");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.log_level, "info");
        assert!(config.admin_psk.is_none());
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(
            normalize_base_url(" http://api.local:8000/ "),
            "http://api.local:8000"
        );
        assert_eq!(normalize_base_url("http://api.local"), "http://api.local");
    }
}
