use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use recorder_server::infrastructure::{build_state, driving::build_router, Settings};

const DEFAULT_LOG_FILTER: &str = "recorder_server=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    info!(
        bind = %settings.server.bind_addr,
        mode = ?settings.stream.mode,
        frame_rate = settings.stream.frame_rate,
        "recorder server starting"
    );

    let bind_addr = settings.server.bind_addr;
    let state = build_state(settings).await?;
    if let Some(clock) = &state.clock {
        clock.resume();
    }

    let app = build_router(state.clone());
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(clock) = &state.clock {
        clock.stop();
    }
    if let Err(e) = state.ledger.flush().await {
        error!(error = %e, "final ledger flush failed");
    }
    info!("recorder server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
