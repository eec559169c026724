//! Coordinator status DTOs

use serde::{Deserialize, Serialize};

use crate::domain::task::TaskState;

/// Number of tasks in each lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub assigned: usize,
    pub done: usize,
    pub failed: usize,
}

impl TaskCounts {
    pub fn record(&mut self, state: TaskState) {
        match state {
            TaskState::Pending => self.pending += 1,
            TaskState::Assigned => self.assigned += 1,
            TaskState::Done => self.done += 1,
            TaskState::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.assigned + self.done + self.failed
    }

    /// Every submitted task reached DONE or FAILED
    pub fn is_drained(&self) -> bool {
        self.pending == 0 && self.assigned == 0
    }
}

/// Process-wide coordinator status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub exit_flag: bool,
    pub submissions_closed: bool,
    pub workers: usize,
    pub tasks: TaskCounts,
    pub queue_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut counts = TaskCounts::default();
        counts.record(TaskState::Pending);
        counts.record(TaskState::Done);
        counts.record(TaskState::Failed);

        assert_eq!(counts.total(), 3);
        assert!(!counts.is_drained());

        counts.pending = 0;
        assert!(counts.is_drained());
    }
}
