//! HTTP probe server for orchestrators
//!
//! Provides health probes:
//! - `/liveness` - Liveness probe (process is running)
//! - `/readiness` and `/health` - Readiness probe (service accepts traffic)
//!
//! Also provides graceful shutdown handling for SIGTERM/SIGINT.

pub mod config;
mod health;
mod probe;
pub mod shutdown;

pub use config::{shutdown_timeout_from_env, ConfigError, ProbeConfig, DEFAULT_PORT};
pub use health::{AlwaysReady, ReadinessCheck, ReadinessState, FAILURE_BODY, SUCCESS_BODY};
pub use probe::{ProbeError, ProbeServer};
pub use shutdown::{shutdown_channel, wait_for_signal, ShutdownController, ShutdownSignal};

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_tests;

#[cfg(test)]
#[path = "probe_test.rs"]
mod probe_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
