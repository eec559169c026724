//! Worker API Handlers
//!
//! Operator endpoints for inspecting and evicting pilot workers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pilot_core::domain::worker::{WorkerKey, WorkerSummary};

use crate::api::error::ApiResult;
use crate::service::Coordinator;

/// GET /workers
pub async fn list_workers(
    State(coordinator): State<Arc<Coordinator>>,
) -> ApiResult<Json<Vec<WorkerSummary>>> {
    tracing::debug!("Listing all workers");
    Ok(Json(coordinator.list_workers()))
}

/// DELETE /workers/{kind}/{name}
/// Force-unregister a worker; its task goes back to the queue
pub async fn evict_worker(
    State(coordinator): State<Arc<Coordinator>>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    coordinator.evict_worker(&WorkerKey::new(kind, name))?;
    Ok(StatusCode::NO_CONTENT)
}
