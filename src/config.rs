//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::{DEFAULT_CACHE_TIME_MINUTES, RESERVED_KEY};
use crate::connection::Endpoint;

/// Which backing store the composition root connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Redis,
    Memory,
}

impl Backend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Some(Backend::Redis),
            "memory" => Some(Backend::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Redis => "redis",
            Backend::Memory => "memory",
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backing store selection
    pub backend: Backend,
    /// Redis endpoints; the first one receives single-key commands
    pub endpoints: Vec<Endpoint>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Logical database index selected on every connection
    pub database: i64,
    /// Upper bound for establishing a connection
    pub connect_timeout: Duration,
    /// Shard count for the in-memory backend
    pub memory_shards: usize,
    /// Cache time in minutes used when a caller does not supply one
    pub default_cache_time: u64,
    /// Key that sweeps and removals never delete
    pub reserved_key: String,
    /// HTTP server port
    pub server_port: u16,
    /// Expiry sweeper interval in seconds (memory backend)
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `REDIS_ENDPOINTS` - Comma-separated `host:port` list (default: 127.0.0.1:6379)
    /// - `REDIS_USERNAME` / `REDIS_PASSWORD` - Optional credentials
    /// - `REDIS_DATABASE` - Database index (default: 0)
    /// - `REDIS_CONNECT_TIMEOUT` - Connect timeout in seconds (default: 5)
    /// - `MEMORY_SHARDS` - In-memory shard count (default: 3)
    /// - `DEFAULT_CACHE_TIME` - Cache time in minutes (default: 60)
    /// - `RESERVED_KEY` - Protected key name (default: DataProtection-Keys)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from any variable source; `from_env` passes the
    /// process environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            backend: lookup("CACHE_BACKEND")
                .and_then(|v| Backend::parse(&v))
                .unwrap_or(defaults.backend),
            endpoints: lookup("REDIS_ENDPOINTS")
                .map(|v| parse_endpoints(&v))
                .filter(|endpoints| !endpoints.is_empty())
                .unwrap_or(defaults.endpoints),
            username: lookup("REDIS_USERNAME").filter(|v| !v.is_empty()),
            password: lookup("REDIS_PASSWORD").filter(|v| !v.is_empty()),
            database: parse_var(&lookup, "REDIS_DATABASE").unwrap_or(defaults.database),
            connect_timeout: parse_var(&lookup, "REDIS_CONNECT_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            memory_shards: parse_var(&lookup, "MEMORY_SHARDS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.memory_shards),
            default_cache_time: parse_var(&lookup, "DEFAULT_CACHE_TIME")
                .unwrap_or(defaults.default_cache_time),
            reserved_key: lookup("RESERVED_KEY")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.reserved_key),
            server_port: parse_var(&lookup, "SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var(&lookup, "CLEANUP_INTERVAL")
                .unwrap_or(defaults.cleanup_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Redis,
            endpoints: vec![Endpoint::new("127.0.0.1", 6379)],
            username: None,
            password: None,
            database: 0,
            connect_timeout: Duration::from_secs(5),
            memory_shards: 3,
            default_cache_time: DEFAULT_CACHE_TIME_MINUTES,
            reserved_key: RESERVED_KEY.to_string(),
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse().ok())
}

/// Parses a comma-separated endpoint list, skipping malformed entries.
fn parse_endpoints(value: &str) -> Vec<Endpoint> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::Redis);
        assert_eq!(config.endpoints, vec![Endpoint::new("127.0.0.1", 6379)]);
        assert_eq!(config.database, 0);
        assert_eq!(config.default_cache_time, 60);
        assert_eq!(config.reserved_key, RESERVED_KEY);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 1);
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_config_from_empty_source_uses_defaults() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config.backend, Backend::Redis);
        assert_eq!(config.endpoints, Config::default().endpoints);
        assert_eq!(config.memory_shards, 3);
        assert_eq!(config.default_cache_time, 60);
        assert_eq!(config.server_port, 3000);
        assert!(config.password.is_none());
    }

    #[test]
    fn test_config_from_source_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("CACHE_BACKEND", "memory"),
            ("REDIS_ENDPOINTS", "10.0.0.1:7000,10.0.0.2:7001"),
            ("REDIS_PASSWORD", "secret"),
            ("REDIS_DATABASE", " 4 "),
            ("MEMORY_SHARDS", "0"),
            ("DEFAULT_CACHE_TIME", "15"),
            ("SERVER_PORT", "not-a-port"),
        ]));

        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.database, 4);
        assert_eq!(config.memory_shards, 3);
        assert_eq!(config.default_cache_time, 15);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_parse_endpoints() {
        let endpoints = parse_endpoints("10.0.0.1:7000, 10.0.0.2:7001,,bogus");
        assert_eq!(
            endpoints,
            vec![Endpoint::new("10.0.0.1", 7000), Endpoint::new("10.0.0.2", 7001)]
        );
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(Backend::parse("Memory"), Some(Backend::Memory));
        assert_eq!(Backend::parse(" redis "), Some(Backend::Redis));
        assert_eq!(Backend::parse("memcached"), None);
    }
}
