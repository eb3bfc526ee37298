//! Liveness and readiness probe server for long-running services

pub mod server;

pub use server::{ProbeConfig, ProbeError, ProbeServer, ReadinessCheck, ReadinessState};
