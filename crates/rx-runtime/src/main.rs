//! # Rx Intake Runtime
//!
//! Entry point of the prescription intake bot. See the library docs for the
//! startup sequence.

use anyhow::{Context, Result};
use rx_gateway::{cleanup_task, CLEANUP_INTERVAL};
use rx_runtime::build_app;
use rx_runtime::config::RuntimeConfig;
use rx_telemetry::{init_telemetry, TelemetryConfig};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_telemetry(telemetry.clone()).context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("Invalid configuration")?;
    if let Err(e) = config.validate() {
        error!("[rx-runtime] ❌ {}", e);
        return Err(e).context("Refusing to start");
    }

    let addr = config.bind_addr()?;
    let app = build_app(&config).context("Failed to build application")?;

    let intake: Arc<dyn rx_intake::IntakeApi> = app.intake.clone();
    let cleanup = tokio::spawn(cleanup_task(intake, CLEANUP_INTERVAL));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(
        service = %telemetry.service_name,
        addr = %addr,
        artifact_dir = %config.artifact_dir.display(),
        "[rx-runtime] 🚀 webhook listening"
    );

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    cleanup.abort();
    info!("[rx-runtime] shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("[rx-runtime] Ctrl+C received, draining in-flight requests"),
        Err(e) => {
            error!("[rx-runtime] cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
