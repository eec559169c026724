//! Task domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::worker::WorkerProcessId;

/// A unit of work
///
/// The callable and its arguments are opaque payloads produced by an external
/// codec. The coordinator stores and forwards them without looking inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefn {
    /// Globally unique, chosen by the submitter
    pub task_id: String,

    #[serde(default, with = "crate::bytes")]
    pub function: Vec<u8>,

    #[serde(default, with = "crate::bytes")]
    pub args: Vec<u8>,

    #[serde(default, with = "crate::bytes")]
    pub kwargs: Vec<u8>,

    /// Optional routing tag; empty means any worker kind may run the task
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

impl TaskDefn {
    /// Generates a fresh task id for submitters that don't bring their own
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Outcome of a task reported by the worker that ran it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,

    pub success: bool,

    /// Encoded return value, present iff `success`
    #[serde(
        default,
        with = "crate::bytes::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub return_value: Option<Vec<u8>>,

    /// Error text, present iff not `success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Machine-readable error class, present iff not `success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,

    /// Worker that produced this result
    pub process_id: WorkerProcessId,
}

impl TaskResult {
    pub fn succeeded(
        task_id: impl Into<String>,
        process_id: WorkerProcessId,
        return_value: Vec<u8>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            return_value: Some(return_value),
            error: None,
            error_id: None,
            process_id,
        }
    }

    pub fn failed(
        task_id: impl Into<String>,
        process_id: WorkerProcessId,
        error_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            return_value: None,
            error: Some(error.into()),
            error_id: Some(error_id.into()),
            process_id,
        }
    }

    /// Drops the fields that don't belong to the reported outcome
    pub fn normalized(mut self) -> Self {
        if self.success {
            self.error = None;
            self.error_id = None;
            self.return_value.get_or_insert_with(Vec::new);
        } else {
            self.return_value = None;
            self.error.get_or_insert_with(|| "unknown error".to_string());
        }
        self
    }
}

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    /// Submitted and waiting in the assignment queue
    Pending,

    /// Handed to exactly one worker
    Assigned,

    /// Completed successfully
    Done,

    /// Completed with an error
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Pending => write!(f, "PENDING"),
            TaskState::Assigned => write!(f, "ASSIGNED"),
            TaskState::Done => write!(f, "DONE"),
            TaskState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Point-in-time view of a task, returned to drivers polling for completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    pub state: TaskState,

    /// How many times the task was handed out
    pub attempts: u32,

    /// Current assignee, present while the task is assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<WorkerProcessId>,

    pub submitted_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Stored result, present once the task is terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
}
