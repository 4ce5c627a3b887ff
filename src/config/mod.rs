//! Configuration handling for the service.
//!
//! Everything is read from environment variables with development defaults,
//! so `Config::from_env` works on a bare machine. Numeric values are parsed
//! and validated up front; a bad value stops the process at startup instead
//! of surfacing on the first request.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::cache;
use crate::fetcher::{FetcherConfig, client};

/// Environment variable names.
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_ALLOWED_HOSTS: &str = "ALLOWED_HOSTS";
pub const ENV_CACHE_CAPACITY: &str = "CACHE_CAPACITY";
pub const ENV_CACHE_MAX_BYTES: &str = "CACHE_MAX_BYTES";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";
pub const ENV_MAX_REDIRECTS: &str = "MAX_REDIRECTS";
pub const ENV_MAX_BODY_BYTES: &str = "MAX_BODY_BYTES";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_ALLOWED_HOSTS: &str = "localhost";
const DEFAULT_CACHE_CAPACITY: usize = cache::DEFAULT_CAPACITY.get();
const DEFAULT_CACHE_MAX_BYTES: usize = cache::DEFAULT_MAX_BYTES;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = client::DEFAULT_TIMEOUT.as_secs();
const DEFAULT_MAX_REDIRECTS: usize = client::DEFAULT_MAX_REDIRECTS;
const DEFAULT_MAX_BODY_BYTES: u64 = client::DEFAULT_MAX_BODY_SIZE;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Service runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    bind_addr: String,
    allowed_hosts: Vec<String>,
    cache_capacity: NonZeroUsize,
    cache_max_bytes: usize,
    fetch_timeout: Duration,
    max_redirects: usize,
    max_body_bytes: u64,
    log_format: LogFormat,
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let allowed_hosts = parse_hosts(
            &env::var(ENV_ALLOWED_HOSTS).unwrap_or_else(|_| DEFAULT_ALLOWED_HOSTS.to_string()),
        );

        let cache_capacity = NonZeroUsize::new(read_number(
            ENV_CACHE_CAPACITY,
            DEFAULT_CACHE_CAPACITY,
        )?)
        .ok_or(ConfigError::InvalidValue {
            field: ENV_CACHE_CAPACITY,
            reason: "must be greater than zero".to_string(),
        })?;

        let cache_max_bytes: usize = read_number(ENV_CACHE_MAX_BYTES, DEFAULT_CACHE_MAX_BYTES)?;
        if cache_max_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_CACHE_MAX_BYTES,
                reason: "must be greater than zero".to_string(),
            });
        }

        let timeout_secs: u64 = read_number(ENV_FETCH_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_FETCH_TIMEOUT_SECS,
                reason: "must be greater than zero".to_string(),
            });
        }

        let max_redirects = read_number(ENV_MAX_REDIRECTS, DEFAULT_MAX_REDIRECTS)?;

        let max_body_bytes: u64 = read_number(ENV_MAX_BODY_BYTES, DEFAULT_MAX_BODY_BYTES)?;
        if max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_MAX_BODY_BYTES,
                reason: "must be greater than zero".to_string(),
            });
        }

        let log_format = match env::var(ENV_LOG_FORMAT).as_deref() {
            Err(_) | Ok("") | Ok("text") => LogFormat::Text,
            Ok("json") => LogFormat::Json,
            Ok(other) => {
                return Err(ConfigError::InvalidValue {
                    field: ENV_LOG_FORMAT,
                    reason: format!("expected 'text' or 'json', got '{other}'"),
                });
            }
        };

        Ok(Self {
            bind_addr,
            allowed_hosts,
            cache_capacity,
            cache_max_bytes,
            fetch_timeout: Duration::from_secs(timeout_secs),
            max_redirects,
            max_body_bytes,
            log_format,
        })
    }

    /// TCP bind address (host:port) for the HTTP server.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Referer hostnames allowed to use the service. An empty entry admits
    /// requests that carry no referer at all.
    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }

    pub fn cache_capacity(&self) -> NonZeroUsize {
        self.cache_capacity
    }

    /// Budget for the summed size of cached results.
    pub fn cache_max_bytes(&self) -> usize {
        self.cache_max_bytes
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// The fetch timeout bounds each hop and the whole redirect chain alike.
    pub fn fetcher(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: self.fetch_timeout,
            deadline: self.fetch_timeout,
            connect_timeout: self.fetch_timeout,
            max_redirects: self.max_redirects,
            max_body_size: self.max_body_bytes,
        }
    }
}

/// Splits a comma separated host list. Entries are trimmed and lowercased;
/// empty entries are kept because they carry meaning.
fn parse_hosts(raw: &str) -> Vec<String> {
    let mut hosts: Vec<String> = raw.split(',').map(|h| h.trim().to_ascii_lowercase()).collect();
    hosts.dedup();
    hosts
}

fn read_number<T: std::str::FromStr>(field: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    match env::var(field) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                field,
                reason: e.to_string(),
            }),
        Err(_) => Ok(default),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}
