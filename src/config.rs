//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Variable                  | Default          |
//! |---------------------------|------------------|
//! | `PORT`                    | `8000`           |
//! | `HANDSHAKE_TIMEOUT_SECS`  | `5`              |
//! | `OUTBOUND_QUEUE_CAPACITY` | `64`             |
//! | `PRODUCER_SENTINEL`       | `esp32-cam`      |
//! | `CONSUMER_SENTINEL`       | `android-client` |
//! | `LOG_FORMAT`              | `pretty`         |

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::domain::Sentinels;
use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Log output format selected with `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind to. Always all interfaces; only the port is
    /// configurable.
    pub listen_addr: SocketAddr,

    /// How long a new connection may take to send its role sentinel.
    pub handshake_timeout: Duration,

    /// Capacity of each connection's outbound queue.
    pub outbound_queue_capacity: usize,

    /// Role handshake strings.
    pub sentinels: Sentinels,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            sentinels: Sentinels::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file
    /// first.
    ///
    /// # Errors
    ///
    /// See [`RelayConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// Missing or unparseable numeric values fall back to their defaults,
    /// except `PORT`, which must be valid when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] for a malformed `PORT`,
    /// [`ConfigError::ZeroValue`] for a zero timeout or queue capacity, and
    /// [`ConfigError::InvalidSentinels`] for empty or identical sentinels.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => DEFAULT_PORT,
        };

        let handshake_timeout_secs = parse_var(
            &lookup,
            "HANDSHAKE_TIMEOUT_SECS",
            DEFAULT_HANDSHAKE_TIMEOUT_SECS,
        );
        if handshake_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("HANDSHAKE_TIMEOUT_SECS"));
        }

        let outbound_queue_capacity = parse_var(
            &lookup,
            "OUTBOUND_QUEUE_CAPACITY",
            DEFAULT_OUTBOUND_QUEUE_CAPACITY,
        );
        if outbound_queue_capacity == 0 {
            return Err(ConfigError::ZeroValue("OUTBOUND_QUEUE_CAPACITY"));
        }

        let defaults = Sentinels::default();
        let sentinels = Sentinels {
            producer: lookup("PRODUCER_SENTINEL").unwrap_or(defaults.producer),
            consumer: lookup("CONSUMER_SENTINEL").unwrap_or(defaults.consumer),
        };
        validate_sentinels(&sentinels)?;

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            handshake_timeout: Duration::from_secs(handshake_timeout_secs),
            outbound_queue_capacity,
            sentinels,
            log_format,
        })
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn validate_sentinels(sentinels: &Sentinels) -> Result<(), ConfigError> {
    if sentinels.producer.is_empty() || sentinels.consumer.is_empty() {
        return Err(ConfigError::InvalidSentinels(
            "sentinels must not be empty".to_string(),
        ));
    }
    if sentinels.producer == sentinels.consumer {
        return Err(ConfigError::InvalidSentinels(format!(
            "producer and consumer sentinels are both {:?}",
            sentinels.producer
        )));
    }
    Ok(())
}
