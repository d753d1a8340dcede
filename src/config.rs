//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Process configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote REST API
    pub api_base_url: String,
    /// Time-to-live of cached remote reads, in seconds
    pub cache_ttl: u64,
    /// Directory holding the durable storage documents
    pub storage_dir: PathBuf,
    /// Local HTTP server port
    pub server_port: u16,
    /// Expired-entry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Buffer size of the broadcast channel
    pub event_capacity: usize,
    /// Timeout applied to every remote request, in seconds
    pub request_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_BASE_URL` - Remote API base (default: http://localhost:8000/api)
    /// - `CACHE_TTL_SECS` - Cache TTL in seconds (default: 900)
    /// - `STORAGE_DIR` - Durable storage directory (default: .sweetshop)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `EVENT_CAPACITY` - Broadcast buffer size (default: 64)
    /// - `REQUEST_TIMEOUT_SECS` - Remote request timeout (default: 15)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            cache_ttl: parsed("CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
            storage_dir: env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            server_port: parsed("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parsed("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            event_capacity: parsed("EVENT_CAPACITY").unwrap_or(defaults.event_capacity),
            request_timeout: parsed("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.request_timeout),
        }
    }

    /// Cache TTL as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}

fn parsed<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            cache_ttl: crate::cache::DEFAULT_TTL_SECS,
            storage_dir: PathBuf::from(".sweetshop"),
            server_port: 3000,
            cleanup_interval: 60,
            event_capacity: 64,
            request_timeout: 15,
        }
    }
}
