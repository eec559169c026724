//! Administrative API Handlers

use std::sync::Arc;

use axum::{Json, extract::State};
use pilot_core::dto::status::CoordinatorStatus;

use crate::service::Coordinator;

/// POST /admin/exit
/// Raise the exit flag; every worker leaves on its next poll
pub async fn set_exit_flag(State(coordinator): State<Arc<Coordinator>>) -> Json<CoordinatorStatus> {
    Json(coordinator.set_exit_flag())
}

/// POST /admin/close
/// Stop accepting tasks and exit once the backlog drains
pub async fn close_submissions(
    State(coordinator): State<Arc<Coordinator>>,
) -> Json<CoordinatorStatus> {
    Json(coordinator.close_submissions())
}

/// GET /status
pub async fn status(State(coordinator): State<Arc<Coordinator>>) -> Json<CoordinatorStatus> {
    Json(coordinator.status())
}
