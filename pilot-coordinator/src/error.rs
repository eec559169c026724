//! Coordinator error types

use pilot_core::domain::task::TaskState;
use pilot_core::domain::worker::WorkerKey;
use pilot_core::dto::error::ErrorCode;
use thiserror::Error;

/// Errors produced by coordinator state transitions
///
/// All of them are reported to the caller; none of them is fatal for the
/// coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("Worker {0} is already registered")]
    AlreadyRegistered(WorkerKey),

    #[error("Worker {0} is not registered")]
    NotRegistered(WorkerKey),

    /// The key is held by a different process than the caller
    #[error("Worker {worker} is registered by another process ({holder})")]
    ProcessMismatch { worker: WorkerKey, holder: String },

    #[error("Task {0} already exists")]
    DuplicateTaskId(String),

    #[error("Task {0} not found")]
    UnknownTaskId(String),

    #[error("Task {task_id} is not assigned to worker {worker}")]
    NotAssigned { task_id: String, worker: WorkerKey },

    #[error("Task submissions are closed")]
    SubmissionsClosed,

    #[error("{0}")]
    ValidationError(String),

    #[error("Task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskState,
        to: TaskState,
    },
}

impl CoordinatorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CoordinatorError::AlreadyRegistered(_) => ErrorCode::AlreadyRegistered,
            CoordinatorError::NotRegistered(_) => ErrorCode::NotRegistered,
            CoordinatorError::ProcessMismatch { .. } => ErrorCode::NotRegistered,
            CoordinatorError::DuplicateTaskId(_) => ErrorCode::DuplicateTaskId,
            CoordinatorError::UnknownTaskId(_) => ErrorCode::UnknownTaskId,
            CoordinatorError::NotAssigned { .. } => ErrorCode::NotAssigned,
            CoordinatorError::SubmissionsClosed => ErrorCode::SubmissionsClosed,
            CoordinatorError::ValidationError(_) => ErrorCode::InvalidRequest,
            CoordinatorError::InvalidTransition { .. } => ErrorCode::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
