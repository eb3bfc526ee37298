use probe::server::{shutdown_timeout_from_env, wait_for_signal, ProbeConfig, ProbeServer};
use tokio::time::Instant;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ProbeConfig::from_env()?;
    let shutdown_timeout = shutdown_timeout_from_env()?;
    info!(
        address = %config.socket_addr(),
        shutdown_timeout = ?shutdown_timeout,
        "Starting probe server"
    );

    let mut server = ProbeServer::new(config);
    server.start().await?;

    // Nothing else to initialize in the standalone daemon
    server.set_ready();
    info!("Ready, serving probes until a termination signal arrives");

    let signal = wait_for_signal().await?;
    info!(signal = signal, "Initiating graceful shutdown");

    // Mark not ready first so the orchestrator stops routing traffic
    server.set_not_ready();

    if let Err(e) = server.stop(Instant::now() + shutdown_timeout).await {
        warn!(error = %e, "Probe server did not shut down cleanly");
        return Err(e.into());
    }

    info!("Probe server shut down gracefully");
    Ok(())
}
