//! Server configuration loaded from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `HOST` | `0.0.0.0` | bind host |
//! | `PORT` | `3001` | bind port |
//! | `DATABASE_URL` | required | `PostgreSQL` URL holding `rain_history` |
//! | `DB_MAX_CONNECTIONS` | `5` | pool size |
//! | `TICK_INTERVAL_MS` | `1000` | live duration update cadence |

use std::str::FromStr;
use std::time::Duration;

/// Default bind host (all interfaces).
const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
const DEFAULT_PORT: u16 = 3001;

/// Default pool size.
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Default cadence of duration updates in milliseconds.
const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {name}")]
    Missing {
        /// Variable name.
        name: &'static str,
    },

    /// A variable is set but cannot be parsed.
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
    /// `PostgreSQL` connection URL.
    pub database_url: String,
    /// Maximum connections in the pool.
    pub db_max_connections: u32,
    /// Cadence of live duration updates.
    pub tick_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing {
            name: "DATABASE_URL",
        })?;

        let tick_interval_ms = parse_or(&get, "TICK_INTERVAL_MS", DEFAULT_TICK_INTERVAL_MS)?;
        if tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "TICK_INTERVAL_MS",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            database_url,
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            tick_interval: Duration::from_millis(tick_interval_ms),
        })
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config =
            ServerConfig::from_lookup(lookup(&[("DATABASE_URL", "postgresql://localhost/rain")]))
                .unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.bind_addr(), "0.0.0.0:3001");
    }

    #[test]
    fn overrides_are_read() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://db/rain"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("DB_MAX_CONNECTIONS", "2"),
            ("TICK_INTERVAL_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.db_max_connections, 2);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "8080")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: "DATABASE_URL" }));
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://db/rain"),
            ("PORT", "seventy"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://db/rain"),
            ("TICK_INTERVAL_MS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TICK_INTERVAL_MS", .. }));
    }
}
