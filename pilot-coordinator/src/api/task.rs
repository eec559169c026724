//! Task API Handlers
//!
//! Driver-facing endpoints: submit tasks and poll their state.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use pilot_core::domain::task::{TaskDefn, TaskSnapshot};

use crate::api::error::ApiResult;
use crate::service::Coordinator;

/// POST /tasks
/// Submit a task; it becomes PENDING immediately
pub async fn submit_task(
    State(coordinator): State<Arc<Coordinator>>,
    payload: Result<Json<TaskDefn>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskSnapshot>)> {
    let Json(defn) = payload?;
    let snapshot = coordinator.submit(defn)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /tasks
/// List all tasks in submission order
pub async fn list_tasks(
    State(coordinator): State<Arc<Coordinator>>,
) -> ApiResult<Json<Vec<TaskSnapshot>>> {
    tracing::debug!("Listing all tasks");
    Ok(Json(coordinator.list_tasks()))
}

/// GET /tasks/{task_id}
pub async fn get_task(
    State(coordinator): State<Arc<Coordinator>>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<TaskSnapshot>> {
    tracing::debug!("Polling task: {}", task_id);
    Ok(Json(coordinator.poll(&task_id)?))
}
