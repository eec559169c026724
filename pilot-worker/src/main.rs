//! Pilot Worker
//!
//! A long-lived process started inside a batch allocation. It registers
//! with the coordinator, pulls tasks one at a time, runs them and reports
//! the results until the coordinator raises the exit flag.
//!
//! Architecture:
//! - Configuration: `PILOT_*` environment variables
//! - Identity: worker kind/name plus batch job, host and pid
//! - Services: payload decoding and function execution
//! - Scheduler: the pull/execute/report loop

mod config;
mod identity;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::scheduler::{TaskPoller, register_with_retry};
use crate::service::{ExecutionService, FunctionRegistry, StandardExecutionService};
use pilot_client::PilotClient;
use pilot_core::codec::JsonCodec;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pilot_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pilot Worker");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let process_id = identity::discover(&config);
    info!(
        "Worker identity: {}, coordinator_url={}",
        process_id, config.coordinator_url
    );

    // Initialize coordinator client
    let client = Arc::new(
        PilotClient::with_timeout(config.coordinator_url.clone(), config.request_timeout)
            .context("Failed to build HTTP client")?,
    );

    let functions = FunctionRegistry::with_builtins();
    info!("Available functions: {}", functions.names().join(", "));

    let execution_service: Arc<dyn ExecutionService> = Arc::new(StandardExecutionService::new(
        Arc::new(JsonCodec),
        functions,
        config.task_timeout,
    ));

    info!("Registering with coordinator");
    register_with_retry(&client, &process_id).await?;

    let poller = TaskPoller::new(config, client, execution_service, process_id);

    match poller.run(shutdown_signal()).await {
        Ok(reason) => {
            info!("Worker exiting: {:?}", reason);
            Ok(())
        }
        Err(e) => {
            error!("Poller error: {:#}", e);
            Err(e)
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM (sent by the batch scheduler at walltime)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
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
}
