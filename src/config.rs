//! Registry configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Variable               | Default        |
//! |------------------------|----------------|
//! | `LISTEN_ADDR`          | `0.0.0.0:3000` |
//! | `SERVICE_TTL_SECS`     | `60`           |
//! | `EXPIRY_TICK_SECS`     | `2`            |
//! | `SESSION_IDLE_SECS`    | `300`          |
//! | `EVENT_BUS_CAPACITY`   | `10000`        |
//! | `REQUEST_TIMEOUT_SECS` | `30`           |
//! | `LOG_FORMAT`           | `text`         |

use std::net::SocketAddr;
use std::time::Duration;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `LISTEN_ADDR` could not be parsed.
    #[error("invalid LISTEN_ADDR {value:?}: {source}")]
    ListenAddr {
        /// Raw value.
        value: String,
        /// Parse failure.
        source: std::net::AddrParseError,
    },
    /// A duration that must be positive was zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    /// The session idle timeout is shorter than the TTL.
    #[error("SESSION_IDLE_SECS ({idle_secs}) must not be below SERVICE_TTL_SECS ({ttl_secs})")]
    SessionIdleBelowTtl {
        /// Configured idle timeout.
        idle_secs: u64,
        /// Configured TTL.
        ttl_secs: u64,
    },
}

/// Top-level registry configuration.
///
/// Loaded once at startup via [`RegistryConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// A registration not refreshed for this long is evicted.
    pub service_ttl: Duration,

    /// Period of the expiry scan.
    pub expiry_tick: Duration,

    /// A session owning no live registration is dropped after this much
    /// silence.
    pub session_idle: Duration,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Per-request timeout applied by the HTTP layer.
    pub request_timeout: Duration,

    /// Tracing output format.
    pub log_format: LogFormat,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            service_ttl: Duration::from_secs(60),
            expiry_tick: Duration::from_secs(2),
            session_idle: Duration::from_secs(300),
            event_bus_capacity: 10_000,
            request_timeout: Duration::from_secs(30),
            log_format: LogFormat::Text,
        }
    }
}

impl RegistryConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `LISTEN_ADDR` is set but cannot be parsed,
    /// if the TTL, tick period or request timeout is zero, or if the
    /// session idle timeout is shorter than the TTL.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`RegistryConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(value) => value
                .parse()
                .map_err(|source| ConfigError::ListenAddr { value, source })?,
            None => defaults.listen_addr,
        };

        let service_ttl = Duration::from_secs(parse_var(&lookup, "SERVICE_TTL_SECS", 60));
        if service_ttl.is_zero() {
            return Err(ConfigError::ZeroDuration("SERVICE_TTL_SECS"));
        }
        let expiry_tick = Duration::from_secs(parse_var(&lookup, "EXPIRY_TICK_SECS", 2));
        if expiry_tick.is_zero() {
            return Err(ConfigError::ZeroDuration("EXPIRY_TICK_SECS"));
        }

        let session_idle = Duration::from_secs(parse_var(&lookup, "SESSION_IDLE_SECS", 300));
        if session_idle < service_ttl {
            return Err(ConfigError::SessionIdleBelowTtl {
                idle_secs: session_idle.as_secs(),
                ttl_secs: service_ttl.as_secs(),
            });
        }

        let event_bus_capacity = parse_var(&lookup, "EVENT_BUS_CAPACITY", 10_000);
        let request_timeout = Duration::from_secs(parse_var(&lookup, "REQUEST_TIMEOUT_SECS", 30));
        if request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("REQUEST_TIMEOUT_SECS"));
        }

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            service_ttl,
            expiry_tick,
            session_idle,
            event_bus_capacity,
            request_timeout,
            log_format,
        })
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let Ok(config) = RegistryConfig::from_lookup(lookup_from(&[])) else {
            panic!("defaults are valid");
        };
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.service_ttl, Duration::from_secs(60));
        assert_eq!(config.expiry_tick, Duration::from_secs(2));
        assert_eq!(config.session_idle, Duration::from_secs(300));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn overrides_are_applied() {
        let Ok(config) = RegistryConfig::from_lookup(lookup_from(&[
            ("LISTEN_ADDR", "127.0.0.1:7000"),
            ("SERVICE_TTL_SECS", "5"),
            ("EXPIRY_TICK_SECS", "1"),
            ("EVENT_BUS_CAPACITY", "16"),
            ("LOG_FORMAT", "json"),
        ])) else {
            panic!("valid overrides");
        };
        assert_eq!(config.listen_addr.port(), 7000);
        assert_eq!(config.service_ttl, Duration::from_secs(5));
        assert_eq!(config.expiry_tick, Duration::from_secs(1));
        assert_eq!(config.event_bus_capacity, 16);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let Ok(config) =
            RegistryConfig::from_lookup(lookup_from(&[("SERVICE_TTL_SECS", "soon")]))
        else {
            panic!("fallback expected");
        };
        assert_eq!(config.service_ttl, Duration::from_secs(60));
    }

    #[test]
    fn bad_listen_addr_is_an_error() {
        let result = RegistryConfig::from_lookup(lookup_from(&[("LISTEN_ADDR", "nowhere")]));
        assert!(matches!(result, Err(ConfigError::ListenAddr { .. })));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let result = RegistryConfig::from_lookup(lookup_from(&[("SERVICE_TTL_SECS", "0")]));
        assert!(matches!(result, Err(ConfigError::ZeroDuration("SERVICE_TTL_SECS"))));
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let result = RegistryConfig::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECS", "0")]));
        assert!(matches!(
            result,
            Err(ConfigError::ZeroDuration("REQUEST_TIMEOUT_SECS"))
        ));
    }

    #[test]
    fn session_idle_below_ttl_is_rejected() {
        let result = RegistryConfig::from_lookup(lookup_from(&[
            ("SERVICE_TTL_SECS", "120"),
            ("SESSION_IDLE_SECS", "60"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::SessionIdleBelowTtl {
                idle_secs: 60,
                ttl_secs: 120
            })
        ));
    }
}
