//! Construction-time configuration for the probe server

use super::health::{AlwaysReady, ReadinessCheck};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default port for the probe endpoints
pub const DEFAULT_PORT: u16 = 8080;

/// Default time allowed for in-flight probes to drain on shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

const PORT_ENV: &str = "PROBE_PORT";
const BIND_ADDRESS_ENV: &str = "PROBE_BIND_ADDRESS";
const SHUTDOWN_TIMEOUT_ENV: &str = "PROBE_SHUTDOWN_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port {value:?}: {reason}")]
    InvalidPort { value: String, reason: String },

    #[error("Invalid bind address {value:?}: {reason}")]
    InvalidBindAddress { value: String, reason: String },

    #[error("Invalid shutdown timeout {value:?}: {reason}")]
    InvalidTimeout { value: String, reason: String },
}

/// Probe server configuration
///
/// Every field has a default; builder methods only touch the field they
/// name and never perform I/O.
#[derive(Clone)]
pub struct ProbeConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    pub readiness_check: Arc<dyn ReadinessCheck>,
}

impl ProbeConfig {
    /// Default configuration listening on `port`
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Read `PROBE_PORT` and `PROBE_BIND_ADDRESS`, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(PORT_ENV) {
            config.port = value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidPort {
                    reason: e.to_string(),
                    value,
                })?;
        }

        if let Some(value) = lookup(BIND_ADDRESS_ENV) {
            config.bind_address = value.trim().parse().map_err(
                |e: std::net::AddrParseError| ConfigError::InvalidBindAddress {
                    reason: e.to_string(),
                    value,
                },
            )?;
        }

        Ok(config)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// Replace the check run by `/readiness` and `/health` once ready
    pub fn with_readiness_check(mut self, check: impl ReadinessCheck + 'static) -> Self {
        self.readiness_check = Arc::new(check);
        self
    }

    /// Socket address the server binds to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

/// Read `PROBE_SHUTDOWN_TIMEOUT_SECS` (whole seconds), defaulting to 10s
pub fn shutdown_timeout_from_env() -> Result<Duration, ConfigError> {
    shutdown_timeout_from_lookup(|key| std::env::var(key).ok())
}

pub(crate) fn shutdown_timeout_from_lookup<F>(lookup: F) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(SHUTDOWN_TIMEOUT_ENV) {
        None => Ok(DEFAULT_SHUTDOWN_TIMEOUT),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidTimeout {
                reason: e.to_string(),
                value,
            }),
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            readiness_check: Arc::new(AlwaysReady),
        }
    }
}

impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}
