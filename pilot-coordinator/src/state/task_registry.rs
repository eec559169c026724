//! Task Registry
//!
//! Holds every submitted task and its lifecycle state.
//! Transitions: PENDING -> ASSIGNED -> (DONE | FAILED), plus ASSIGNED -> PENDING
//! when the assignee goes away. Terminal states are never left.

use chrono::{DateTime, Utc};
use pilot_core::domain::task::{TaskDefn, TaskResult, TaskSnapshot, TaskState};
use pilot_core::domain::worker::WorkerProcessId;
use pilot_core::dto::status::TaskCounts;
use std::collections::HashMap;

use crate::error::{CoordinatorError, Result};

/// A task as tracked by the coordinator
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub defn: TaskDefn,

    /// Submission order, used by the assignment queue
    pub seq: u64,

    pub state: TaskState,

    /// Worker holding the task while ASSIGNED
    pub assignee: Option<WorkerProcessId>,

    /// Number of times the task was handed out
    pub attempts: u32,

    pub submitted_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Stored once the task is terminal
    pub result: Option<TaskResult>,
}

impl TaskRecord {
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.defn.task_id.clone(),
            kind: self.defn.kind.clone(),
            state: self.state,
            attempts: self.attempts,
            assigned_to: self.assignee.clone(),
            submitted_at: self.submitted_at,
            assigned_at: self.assigned_at,
            completed_at: self.completed_at,
            result: self.result.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, TaskRecord>,
    next_seq: u64,
    counts: TaskCounts,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task in PENDING state and returns its submission sequence number
    pub fn submit(&mut self, defn: TaskDefn, now: DateTime<Utc>) -> Result<u64> {
        if self.tasks.contains_key(&defn.task_id) {
            return Err(CoordinatorError::DuplicateTaskId(defn.task_id));
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let record = TaskRecord {
            defn,
            seq,
            state: TaskState::Pending,
            assignee: None,
            attempts: 0,
            submitted_at: now,
            assigned_at: None,
            completed_at: None,
            result: None,
        };

        self.counts.record(TaskState::Pending);
        self.tasks.insert(record.defn.task_id.clone(), record);

        Ok(seq)
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskRecord> {
        self.tasks.get(task_id)
    }

    /// Moves a PENDING task to ASSIGNED and returns its definition
    pub fn mark_assigned(
        &mut self,
        task_id: &str,
        worker: &WorkerProcessId,
        now: DateTime<Utc>,
    ) -> Result<TaskDefn> {
        let record = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| CoordinatorError::UnknownTaskId(task_id.to_string()))?;

        if record.state != TaskState::Pending {
            return Err(CoordinatorError::InvalidTransition {
                task_id: task_id.to_string(),
                from: record.state,
                to: TaskState::Assigned,
            });
        }

        record.state = TaskState::Assigned;
        record.assignee = Some(worker.clone());
        record.assigned_at = Some(now);
        record.attempts += 1;

        self.counts.pending -= 1;
        self.counts.assigned += 1;

        Ok(record.defn.clone())
    }

    /// Returns an ASSIGNED task to PENDING
    ///
    /// Yields the task's original sequence number and kind so the queue can
    /// put it back in submission order.
    pub fn requeue(&mut self, task_id: &str) -> Result<(u64, String)> {
        let record = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| CoordinatorError::UnknownTaskId(task_id.to_string()))?;

        if record.state != TaskState::Assigned {
            return Err(CoordinatorError::InvalidTransition {
                task_id: task_id.to_string(),
                from: record.state,
                to: TaskState::Pending,
            });
        }

        record.state = TaskState::Pending;
        record.assignee = None;
        record.assigned_at = None;

        self.counts.assigned -= 1;
        self.counts.pending += 1;

        Ok((record.seq, record.defn.kind.clone()))
    }

    /// Stores a result and moves the task to DONE or FAILED
    ///
    /// Only the worker currently holding the task may complete it. Anything
    /// else is a stale or duplicate report and yields `NotAssigned`.
    pub fn record_result(&mut self, result: TaskResult, now: DateTime<Utc>) -> Result<TaskState> {
        let record = self
            .tasks
            .get_mut(&result.task_id)
            .ok_or_else(|| CoordinatorError::UnknownTaskId(result.task_id.clone()))?;

        let reporter = result.process_id.key();
        let held_by_reporter = record.state == TaskState::Assigned
            && record
                .assignee
                .as_ref()
                .is_some_and(|assignee| assignee.key() == reporter);

        if !held_by_reporter {
            return Err(CoordinatorError::NotAssigned {
                task_id: result.task_id,
                worker: reporter,
            });
        }

        let state = if result.success {
            TaskState::Done
        } else {
            TaskState::Failed
        };

        record.state = state;
        record.assignee = None;
        record.completed_at = Some(now);
        record.result = Some(result.normalized());

        self.counts.assigned -= 1;
        self.counts.record(state);

        Ok(state)
    }

    pub fn snapshot(&self, task_id: &str) -> Result<TaskSnapshot> {
        self.tasks
            .get(task_id)
            .map(TaskRecord::snapshot)
            .ok_or_else(|| CoordinatorError::UnknownTaskId(task_id.to_string()))
    }

    /// All tasks in submission order
    pub fn list(&self) -> Vec<TaskSnapshot> {
        let mut records: Vec<&TaskRecord> = self.tasks.values().collect();
        records.sort_by_key(|record| record.seq);
        records.into_iter().map(TaskRecord::snapshot).collect()
    }

    pub fn counts(&self) -> TaskCounts {
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> TaskDefn {
        TaskDefn {
            task_id: id.to_string(),
            function: b"echo".to_vec(),
            args: Vec::new(),
            kwargs: Vec::new(),
            kind: String::new(),
        }
    }

    fn worker(name: &str) -> WorkerProcessId {
        WorkerProcessId::new("cpu", name)
    }

    #[test]
    fn test_submit_assigns_increasing_sequence() {
        let mut registry = TaskRegistry::new();
        let now = Utc::now();

        assert_eq!(registry.submit(task("b"), now).unwrap(), 0);
        assert_eq!(registry.submit(task("a"), now).unwrap(), 1);
        assert_eq!(registry.counts().pending, 2);

        let ids: Vec<_> = registry.list().into_iter().map(|s| s.task_id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_duplicate_task_id() {
        let mut registry = TaskRegistry::new();
        registry.submit(task("t1"), Utc::now()).unwrap();

        assert_eq!(
            registry.submit(task("t1"), Utc::now()),
            Err(CoordinatorError::DuplicateTaskId("t1".to_string()))
        );
        assert_eq!(registry.counts().pending, 1);
    }

    #[test]
    fn test_result_requires_assignment() {
        let mut registry = TaskRegistry::new();
        registry.submit(task("t1"), Utc::now()).unwrap();

        // No PENDING -> DONE shortcut
        let result = TaskResult::succeeded("t1", worker("w0"), b"1".to_vec());
        assert!(matches!(
            registry.record_result(result, Utc::now()),
            Err(CoordinatorError::NotAssigned { .. })
        ));
        assert_eq!(registry.get("t1").unwrap().state, TaskState::Pending);
    }

    #[test]
    fn test_result_from_other_worker_is_rejected() {
        let mut registry = TaskRegistry::new();
        registry.submit(task("t1"), Utc::now()).unwrap();
        registry
            .mark_assigned("t1", &worker("w0"), Utc::now())
            .unwrap();

        let result = TaskResult::succeeded("t1", worker("w1"), b"1".to_vec());
        assert!(matches!(
            registry.record_result(result, Utc::now()),
            Err(CoordinatorError::NotAssigned { .. })
        ));
        assert_eq!(registry.get("t1").unwrap().state, TaskState::Assigned);
    }

    #[test]
    fn test_terminal_state_is_final() {
        let mut registry = TaskRegistry::new();
        registry.submit(task("t1"), Utc::now()).unwrap();
        registry
            .mark_assigned("t1", &worker("w0"), Utc::now())
            .unwrap();

        let failed = TaskResult::failed("t1", worker("w0"), "ValueError", "bad input");
        assert_eq!(
            registry.record_result(failed, Utc::now()).unwrap(),
            TaskState::Failed
        );

        // A retried report cannot flip FAILED into DONE
        let retry = TaskResult::succeeded("t1", worker("w0"), b"1".to_vec());
        assert!(registry.record_result(retry, Utc::now()).is_err());
        assert!(registry.requeue("t1").is_err());
        assert!(registry.mark_assigned("t1", &worker("w0"), Utc::now()).is_err());

        let snapshot = registry.snapshot("t1").unwrap();
        assert_eq!(snapshot.state, TaskState::Failed);
        assert_eq!(
            snapshot.result.unwrap().error_id.as_deref(),
            Some("ValueError")
        );

        let counts = registry.counts();
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.done, 0);
        assert!(counts.is_drained());
    }

    #[test]
    fn test_requeue_keeps_sequence() {
        let mut registry = TaskRegistry::new();
        registry.submit(task("t1"), Utc::now()).unwrap();
        let seq = registry.submit(task("t2"), Utc::now()).unwrap();
        registry
            .mark_assigned("t2", &worker("w0"), Utc::now())
            .unwrap();

        assert_eq!(registry.requeue("t2").unwrap(), (seq, String::new()));

        let record = registry.get("t2").unwrap();
        assert_eq!(record.state, TaskState::Pending);
        assert_eq!(record.assignee, None);
        assert_eq!(record.attempts, 1);
        assert_eq!(registry.counts().pending, 2);
    }

    #[test]
    fn test_unknown_task() {
        let mut registry = TaskRegistry::new();
        let result = TaskResult::succeeded("missing", worker("w0"), Vec::new());

        assert_eq!(
            registry.record_result(result, Utc::now()),
            Err(CoordinatorError::UnknownTaskId("missing".to_string()))
        );
        assert!(registry.snapshot("missing").is_err());
    }
}
