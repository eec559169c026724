//! Protocol messages for the pilot-worker RPC surface

use serde::{Deserialize, Serialize};

use crate::domain::task::TaskDefn;

/// Empty response body of the acknowledging RPCs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Response to GetNextTask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    /// The worker must leave its loop
    #[serde(default)]
    pub exit_flag: bool,

    /// `task` carries work for the caller
    #[serde(default)]
    pub task_available: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskDefn>,
}

impl TaskAssignment {
    /// Instructs the worker to terminate
    pub fn exit() -> Self {
        Self {
            exit_flag: true,
            task_available: false,
            task: None,
        }
    }

    /// Nothing to do right now, back off and retry
    pub fn idle() -> Self {
        Self {
            exit_flag: false,
            task_available: false,
            task: None,
        }
    }

    pub fn assigned(task: TaskDefn) -> Self {
        Self {
            exit_flag: false,
            task_available: true,
            task: Some(task),
        }
    }
}
