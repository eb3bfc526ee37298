//! Probe server lifecycle
//!
//! `Created -> start -> Serving -> stop -> Stopped`
//!
//! `start` binds the listener and hands the serving loop to a background
//! task; `stop` asks that task to shut down gracefully and waits for it
//! until the caller's deadline.

use super::config::ProbeConfig;
use super::health::{build_router, ReadinessState};
use super::shutdown::{shutdown_channel, ShutdownController};
use axum::Router;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to bind probe server to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Probe server already started")]
    AlreadyStarted,

    #[error("Probe server already stopped")]
    AlreadyStopped,

    #[error("Probe server shutdown deadline exceeded")]
    DeadlineExceeded,

    #[error("Probe serving task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

enum Lifecycle {
    Created,
    Serving(Serving),
    Stopped,
}

struct Serving {
    local_addr: SocketAddr,
    // Dropping the controller also ends the serving loop.
    controller: ShutdownController,
    handle: JoinHandle<()>,
}

/// HTTP server answering liveness and readiness probes
///
/// The owning service keeps the server and calls [`ProbeServer::set_ready`]
/// once initialized. Other components that need to toggle readiness get
/// their own handle through [`ProbeServer::readiness`].
pub struct ProbeServer {
    addr: SocketAddr,
    readiness: ReadinessState,
    router: Router,
    lifecycle: Lifecycle,
}

impl ProbeServer {
    /// Create a probe server (not ready, not serving)
    pub fn new(config: ProbeConfig) -> Self {
        let readiness = ReadinessState::new();
        let router = build_router(readiness.clone(), config.readiness_check.clone());

        Self {
            addr: config.socket_addr(),
            readiness,
            router,
            lifecycle: Lifecycle::Created,
        }
    }

    /// Bind the listener and start serving in the background
    ///
    /// Returns as soon as the socket is bound, with the bound address.
    /// Errors that happen later in the serving loop are only logged.
    pub async fn start(&mut self) -> Result<SocketAddr, ProbeError> {
        match self.lifecycle {
            Lifecycle::Created => {}
            Lifecycle::Serving(_) => return Err(ProbeError::AlreadyStarted),
            Lifecycle::Stopped => return Err(ProbeError::AlreadyStopped),
        }

        let addr = self.addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ProbeError::Bind { addr, source })
            .inspect_err(|e| error!(error = %e, "Probe server failed to start"))?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ProbeError::Bind { addr, source })?;

        let (controller, mut signal) = shutdown_channel();
        let app = self.router.clone();

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.wait().await })
                .await;

            match result {
                Ok(()) => info!(address = %local_addr, "Probe server stopped"),
                Err(e) => {
                    warn!(address = %local_addr, error = %e, "Probe server stopped with error")
                }
            }
        });

        info!(address = %local_addr, "Probe server listening");
        self.lifecycle = Lifecycle::Serving(Serving {
            local_addr,
            controller,
            handle,
        });

        Ok(local_addr)
    }

    /// Gracefully stop serving, waiting for in-flight probes until `deadline`
    ///
    /// Stopping a server that never started, or stopping twice, is a no-op.
    /// If the deadline passes (or has already passed) the serving task is
    /// aborted and [`ProbeError::DeadlineExceeded`] is returned.
    pub async fn stop(&mut self, deadline: Instant) -> Result<(), ProbeError> {
        let Serving {
            local_addr,
            controller,
            mut handle,
        } = match std::mem::replace(&mut self.lifecycle, Lifecycle::Stopped) {
            Lifecycle::Serving(serving) => serving,
            Lifecycle::Created | Lifecycle::Stopped => return Ok(()),
        };

        controller.shutdown();

        if Instant::now() >= deadline {
            handle.abort();
            warn!(address = %local_addr, "Probe server shutdown deadline already expired");
            return Err(ProbeError::DeadlineExceeded);
        }

        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(joined) => {
                joined?;
                info!(address = %local_addr, "Probe server shut down gracefully");
                Ok(())
            }
            Err(_) => {
                handle.abort();
                warn!(address = %local_addr, "Probe server shutdown deadline exceeded");
                Err(ProbeError::DeadlineExceeded)
            }
        }
    }

    /// Mark the service as ready to receive traffic
    pub fn set_ready(&self) {
        self.readiness.set_ready();
    }

    /// Mark the service as not ready; probes answer 503 from now on
    pub fn set_not_ready(&self) {
        self.readiness.set_not_ready();
    }

    /// Whether probes currently see the service as ready
    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Shared handle onto this server's readiness flag
    pub fn readiness(&self) -> ReadinessState {
        self.readiness.clone()
    }

    /// Address the listener is bound to, while serving
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.lifecycle {
            Lifecycle::Serving(serving) => Some(serving.local_addr),
            Lifecycle::Created | Lifecycle::Stopped => None,
        }
    }
}
