//! Lease sweeper
//!
//! Background task that evicts workers whose lease ran out, returning their
//! tasks to the queue. Only started when a lease is configured.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tokio::time;

use crate::service::Coordinator;

/// Starts a background task that expires silent workers every `sweep_interval`
pub fn start_lease_sweeper(
    coordinator: Arc<Coordinator>,
    lease: Duration,
    sweep_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    let lease = TimeDelta::from_std(lease).unwrap_or(TimeDelta::MAX);

    tokio::spawn(async move {
        let mut ticker = time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match coordinator.expire_workers(lease) {
                Ok(0) => tracing::debug!("Lease sweep: no expired workers"),
                Ok(count) => tracing::info!("Lease sweep evicted {} worker(s)", count),
                Err(e) => tracing::error!("Lease sweep failed: {}", e),
            }
        }
    })
}
