use std::sync::Arc;

use anyhow::Context;
use pilot_coordinator::{api, config::Config, service::Coordinator, service::lease};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pilot_coordinator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pilot Coordinator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    tracing::info!("Kind routing: {:?}", config.kind_routing);

    let coordinator = Arc::new(Coordinator::new(config.kind_routing));

    let sweeper = match config.worker_lease {
        Some(lease) => {
            tracing::info!(
                "Worker lease: {:?}, sweep interval: {:?}",
                lease,
                config.sweep_interval
            );
            Some(lease::start_lease_sweeper(
                Arc::clone(&coordinator),
                lease,
                config.sweep_interval,
            ))
        }
        None => {
            tracing::info!("Worker leases disabled");
            None
        }
    };

    // Build router with all API endpoints
    let app = api::create_router(Arc::clone(&coordinator));

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    let status = coordinator.status();
    tracing::info!(
        "Coordinator stopped: {} done, {} failed, {} unfinished",
        status.tasks.done,
        status.tasks.failed,
        status.tasks.pending + status.tasks.assigned
    );

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
