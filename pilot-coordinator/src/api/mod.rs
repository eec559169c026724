//! API Module
//!
//! HTTP API layer for the coordinator.
//! Each submodule handles endpoints for a specific concern.

pub mod admin;
pub mod error;
pub mod health;
pub mod protocol;
pub mod task;
pub mod worker;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::service::Coordinator;

/// Create the main API router with all endpoints
pub fn create_router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Worker protocol
        .route(
            "/rpc/RegisterWorkerProcess",
            post(protocol::register_worker_process),
        )
        .route(
            "/rpc/UnregisterWorkerProcess",
            post(protocol::unregister_worker_process),
        )
        .route("/rpc/GetNextTask", post(protocol::get_next_task))
        .route("/rpc/SetTaskResult", post(protocol::set_task_result))
        .route("/rpc/Heartbeat", post(protocol::heartbeat))
        // Task endpoints
        .route("/tasks", post(task::submit_task).get(task::list_tasks))
        .route("/tasks/{task_id}", get(task::get_task))
        // Worker endpoints
        .route("/workers", get(worker::list_workers))
        .route("/workers/{kind}/{name}", delete(worker::evict_worker))
        // Administration
        .route("/admin/exit", post(admin::set_exit_flag))
        .route("/admin/close", post(admin::close_submissions))
        .route("/status", get(admin::status))
        // Add state and middleware
        .with_state(coordinator)
        .layer(TraceLayer::new_for_http())
}
