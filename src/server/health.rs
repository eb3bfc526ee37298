//! Health probe endpoints for orchestrators
//!
//! - `/liveness` - Is the process alive and able to answer HTTP?
//! - `/readiness` - Is the service ready to receive traffic?
//! - `/health` - Alias of `/readiness`

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Body written for a successful probe
pub const SUCCESS_BODY: &str = "OK";

/// Body written for a failed probe
pub const FAILURE_BODY: &str = "FAIL";

/// Shared state for readiness tracking
///
/// The owning service sets this to ready once it's fully initialized,
/// and back to not ready at the start of its shutdown sequence.
#[derive(Debug, Clone)]
pub struct ReadinessState {
    ready: Arc<AtomicBool>,
}

impl ReadinessState {
    /// Create a new readiness state (initially not ready)
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the service as ready
    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Mark the service as not ready (e.g., during shutdown)
    ///
    /// This causes the readiness probe to return 503, signaling to
    /// the orchestrator that no new traffic should be routed here.
    pub fn set_not_ready(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    /// Check if the service is ready
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

impl Default for ReadinessState {
    fn default() -> Self {
        Self::new()
    }
}

/// Deeper readiness logic run once the coarse flag says ready
///
/// Implementations typically check downstream dependencies (database,
/// upstream APIs) and return whatever response the orchestrator should see.
/// The check is never invoked while the service is marked not ready.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    async fn check(&self) -> Response;
}

/// Default readiness check
///
/// Answers exactly like the liveness probe: the flag alone decides readiness.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

#[async_trait]
impl ReadinessCheck for AlwaysReady {
    async fn check(&self) -> Response {
        success().into_response()
    }
}

/// Router state shared by all probe handlers
#[derive(Clone)]
pub(crate) struct ProbeState {
    readiness: ReadinessState,
    check: Arc<dyn ReadinessCheck>,
}

fn success() -> (StatusCode, &'static str) {
    (StatusCode::OK, SUCCESS_BODY)
}

fn failure() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, FAILURE_BODY)
}

/// Liveness probe handler
///
/// Always returns 200 OK - if this responds, the process is alive.
async fn liveness() -> impl IntoResponse {
    success()
}

/// Readiness probe handler, also mounted on `/health`
///
/// Returns 503 FAIL while not ready without touching the configured check.
async fn readiness(State(state): State<ProbeState>) -> Response {
    if !state.readiness.is_ready() {
        debug!("Readiness probe failed: not ready");
        return failure().into_response();
    }

    let response = state.check.check().await;
    debug!(status = %response.status(), "Readiness probe answered");
    response
}

/// Build the router for the probe endpoints
pub(crate) fn build_router(readiness: ReadinessState, check: Arc<dyn ReadinessCheck>) -> Router {
    let state = ProbeState { readiness, check };

    Router::new()
        .route("/liveness", get(liveness))
        .route("/readiness", get(self::readiness))
        .route("/health", get(self::readiness))
        .with_state(state)
}
