//! Worker Protocol API Handlers
//!
//! The RPC surface spoken by pilot workers. Each call is a POST to
//! `/rpc/<Method>` with a JSON body.

use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use pilot_core::domain::task::TaskResult;
use pilot_core::domain::worker::WorkerProcessId;
use pilot_core::dto::assignment::{Empty, TaskAssignment};

use crate::api::error::ApiResult;
use crate::service::Coordinator;

/// POST /rpc/RegisterWorkerProcess
pub async fn register_worker_process(
    State(coordinator): State<Arc<Coordinator>>,
    payload: Result<Json<WorkerProcessId>, JsonRejection>,
) -> ApiResult<Json<Empty>> {
    let Json(process_id) = payload?;
    coordinator.register_worker(process_id)?;
    Ok(Json(Empty {}))
}

/// POST /rpc/UnregisterWorkerProcess
pub async fn unregister_worker_process(
    State(coordinator): State<Arc<Coordinator>>,
    payload: Result<Json<WorkerProcessId>, JsonRejection>,
) -> ApiResult<Json<Empty>> {
    let Json(process_id) = payload?;
    coordinator.unregister_worker(&process_id)?;
    Ok(Json(Empty {}))
}

/// POST /rpc/GetNextTask
/// Never blocks: answers immediately with a task, nothing, or the exit flag
pub async fn get_next_task(
    State(coordinator): State<Arc<Coordinator>>,
    payload: Result<Json<WorkerProcessId>, JsonRejection>,
) -> ApiResult<Json<TaskAssignment>> {
    let Json(process_id) = payload?;
    let assignment = coordinator.next_task(&process_id)?;
    Ok(Json(assignment))
}

/// POST /rpc/SetTaskResult
pub async fn set_task_result(
    State(coordinator): State<Arc<Coordinator>>,
    payload: Result<Json<TaskResult>, JsonRejection>,
) -> ApiResult<Json<Empty>> {
    let Json(result) = payload?;
    coordinator.set_task_result(result)?;
    Ok(Json(Empty {}))
}

/// POST /rpc/Heartbeat
pub async fn heartbeat(
    State(coordinator): State<Arc<Coordinator>>,
    payload: Result<Json<WorkerProcessId>, JsonRejection>,
) -> ApiResult<Json<Empty>> {
    let Json(process_id) = payload?;
    coordinator.heartbeat(&process_id)?;
    Ok(Json(Empty {}))
}
