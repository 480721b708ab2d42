//! Server configuration
//!
//! Values come from the environment; nothing outside this module reads
//! environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_HOST, DEFAULT_MODEL_DIR, DEFAULT_PORT, DEFAULT_RATE_LIMIT_PER_MINUTE,
};

/// Configuration for the scoring server
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Bind host (CREDIT_HOST)
    pub host: String,
    /// Bind port (PORT, then CREDIT_PORT)
    pub port: u16,
    /// Directory holding the model artifacts (CREDIT_MODEL_DIR)
    pub model_dir: PathBuf,
    /// Requests per window per client (CREDIT_RATE_LIMIT)
    pub rate_limit_per_window: u32,
    /// Rate limit window
    pub rate_limit_window: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            rate_limit_per_window: DEFAULT_RATE_LIMIT_PER_MINUTE,
            rate_limit_window: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    /// Read configuration from process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Unparseable numbers fall
    /// back to defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let host = lookup("CREDIT_HOST")
            .filter(|h| !h.is_empty())
            .unwrap_or(defaults.host);

        // Hosting platforms inject PORT, CREDIT_PORT is for local dev
        let port = ["PORT", "CREDIT_PORT"]
            .into_iter()
            .find_map(|key| lookup(key).and_then(|raw| parse_or_warn::<u16>(key, &raw)))
            .unwrap_or(defaults.port);

        let model_dir = lookup("CREDIT_MODEL_DIR")
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.model_dir);

        let rate_limit_per_window = lookup("CREDIT_RATE_LIMIT")
            .and_then(|raw| parse_or_warn::<u32>("CREDIT_RATE_LIMIT", &raw))
            .filter(|limit| *limit > 0)
            .unwrap_or(defaults.rate_limit_per_window);

        let config = Self {
            host,
            port,
            model_dir,
            rate_limit_per_window,
            rate_limit_window: defaults.rate_limit_window,
        };
        info!(
            host = %config.host,
            port = config.port,
            model_dir = %config.model_dir.display(),
            rate_limit = config.rate_limit_per_window,
            "Configuration loaded"
        );
        config
    }

    /// Socket address to bind
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|_| {
            AppError::invalid_config(format!("Invalid bind address {}:{}", self.host, self.port))
        })
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_port_precedence() {
        let config = AppConfig::from_lookup(lookup_from(&[("PORT", "9000"), ("CREDIT_PORT", "9001")]));
        assert_eq!(config.port, 9000);

        let config = AppConfig::from_lookup(lookup_from(&[("CREDIT_PORT", "9001")]));
        assert_eq!(config.port, 9001);
    }

    #[test]
    fn test_bad_port_falls_through_to_credit_port() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("CREDIT_PORT", "9001"),
        ]));
        assert_eq!(config.port, 9001);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("CREDIT_RATE_LIMIT", "0"),
        ]));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.rate_limit_per_window, DEFAULT_RATE_LIMIT_PER_MINUTE);
    }

    #[test]
    fn test_model_dir_and_socket_addr() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CREDIT_MODEL_DIR", "/srv/models"),
            ("CREDIT_HOST", "127.0.0.1"),
        ]));
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8080");

        let bad = AppConfig {
            host: "not a host".to_string(),
            ..AppConfig::default()
        };
        assert!(bad.socket_addr().is_err());
    }
}
