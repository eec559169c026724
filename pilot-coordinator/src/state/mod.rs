//! State Module
//!
//! In-memory state of the coordinator. [`CoordinatorState`] composes the task
//! registry, the worker registry and the assignment queue, and implements
//! every operation as one transition over all three. It is not synchronized
//! itself; the service layer keeps it behind a single lock.
//!
//! Invariant: a task is ASSIGNED to worker K exactly when K's entry records
//! it as its assigned task, and a task is in the queue exactly when it is
//! PENDING.

pub mod assignment_queue;
pub mod task_registry;
pub mod worker_registry;

pub use assignment_queue::{AssignmentQueue, KindRouting};
pub use task_registry::{TaskRecord, TaskRegistry};
pub use worker_registry::{WorkerEntry, WorkerRegistry};

use chrono::{DateTime, TimeDelta, Utc};
use pilot_core::domain::task::{TaskDefn, TaskResult, TaskSnapshot, TaskState};
use pilot_core::domain::worker::{WorkerKey, WorkerProcessId, WorkerSummary};
use pilot_core::dto::assignment::TaskAssignment;
use pilot_core::dto::status::CoordinatorStatus;

use crate::error::{CoordinatorError, Result};

#[derive(Debug)]
pub struct CoordinatorState {
    tasks: TaskRegistry,
    workers: WorkerRegistry,
    queue: AssignmentQueue,

    /// Monotonic: once raised, every worker is told to exit
    exit_flag: bool,

    /// No more submissions; the exit flag follows once the backlog drains
    submissions_closed: bool,
}

impl CoordinatorState {
    pub fn new(routing: KindRouting) -> Self {
        Self {
            tasks: TaskRegistry::new(),
            workers: WorkerRegistry::new(),
            queue: AssignmentQueue::new(routing),
            exit_flag: false,
            submissions_closed: false,
        }
    }

    // =============================================================================
    // Worker Protocol
    // =============================================================================

    pub fn register_worker(&mut self, process_id: WorkerProcessId, now: DateTime<Utc>) -> Result<()> {
        self.workers.register(process_id, now)
    }

    /// Removes a worker and requeues the task it held
    ///
    /// Returns the id of the requeued task, if any.
    pub fn unregister_worker(&mut self, key: &WorkerKey) -> Result<Option<String>> {
        let entry = self.workers.unregister(key)?;
        self.release(entry)
    }

    /// Like [`Self::unregister_worker`], but only for the process that registered
    pub fn unregister_process(&mut self, process_id: &WorkerProcessId) -> Result<Option<String>> {
        let entry = self.workers.unregister_process(process_id)?;
        self.release(entry)
    }

    fn release(&mut self, entry: WorkerEntry) -> Result<Option<String>> {
        match entry.assigned_task {
            Some(task_id) => {
                let (seq, kind) = self.tasks.requeue(&task_id)?;
                self.queue.push(seq, task_id.clone(), &kind);
                Ok(Some(task_id))
            }
            None => Ok(None),
        }
    }

    pub fn heartbeat(&mut self, key: &WorkerKey, now: DateTime<Utc>) -> Result<()> {
        if self.workers.touch(key, now) {
            Ok(())
        } else {
            Err(CoordinatorError::NotRegistered(key.clone()))
        }
    }

    /// Hands the calling worker its next task
    ///
    /// A worker holds at most one task. If it asks again while holding one
    /// (for instance after losing the previous response), the same task is
    /// delivered again instead of a second one.
    pub fn next_task(
        &mut self,
        process_id: &WorkerProcessId,
        now: DateTime<Utc>,
    ) -> Result<TaskAssignment> {
        if self.exit_flag {
            return Ok(TaskAssignment::exit());
        }

        let key = process_id.key();
        let entry = self
            .workers
            .get_mut(&key)
            .ok_or_else(|| CoordinatorError::NotRegistered(key.clone()))?;
        entry.last_seen_at = entry.last_seen_at.max(now);

        if let Some(task_id) = &entry.assigned_task {
            let record = self
                .tasks
                .get(task_id)
                .ok_or_else(|| CoordinatorError::UnknownTaskId(task_id.clone()))?;
            return Ok(TaskAssignment::assigned(record.defn.clone()));
        }

        let Some(task_id) = self.queue.pop_for(&key.kind) else {
            return Ok(TaskAssignment::idle());
        };

        let defn = self.tasks.mark_assigned(&task_id, &entry.process_id, now)?;
        entry.assigned_task = Some(task_id);

        Ok(TaskAssignment::assigned(defn))
    }

    /// Completes the task held by the reporting worker
    pub fn set_task_result(&mut self, result: TaskResult, now: DateTime<Utc>) -> Result<TaskState> {
        let key = result.process_id.key();
        let task_id = result.task_id.clone();

        let state = self.tasks.record_result(result, now)?;

        if let Some(entry) = self.workers.get_mut(&key) {
            if entry.assigned_task.as_deref() == Some(task_id.as_str()) {
                entry.assigned_task = None;
            }
            entry.tasks_completed += 1;
            entry.last_seen_at = entry.last_seen_at.max(now);
        }

        self.raise_exit_if_drained();

        Ok(state)
    }

    // =============================================================================
    // Driver Operations
    // =============================================================================

    pub fn submit(&mut self, defn: TaskDefn, now: DateTime<Utc>) -> Result<TaskSnapshot> {
        if self.submissions_closed || self.exit_flag {
            return Err(CoordinatorError::SubmissionsClosed);
        }

        let task_id = defn.task_id.clone();
        let kind = defn.kind.clone();
        let seq = self.tasks.submit(defn, now)?;
        self.queue.push(seq, task_id.clone(), &kind);

        self.tasks.snapshot(&task_id)
    }

    pub fn poll(&self, task_id: &str) -> Result<TaskSnapshot> {
        self.tasks.snapshot(task_id)
    }

    /// Raises the exit flag; returns false if it was already raised
    pub fn set_exit_flag(&mut self) -> bool {
        let changed = !self.exit_flag;
        self.exit_flag = true;
        changed
    }

    /// Stops accepting submissions; returns true if this raised the exit flag
    pub fn close_submissions(&mut self) -> bool {
        self.submissions_closed = true;
        self.raise_exit_if_drained()
    }

    fn raise_exit_if_drained(&mut self) -> bool {
        if self.submissions_closed && !self.exit_flag && self.tasks.counts().is_drained() {
            self.exit_flag = true;
            return true;
        }
        false
    }

    // =============================================================================
    // Liveness
    // =============================================================================

    /// Unregisters every worker whose lease ran out
    ///
    /// Returns each evicted worker with the task that was requeued for it.
    pub fn expire_workers(
        &mut self,
        now: DateTime<Utc>,
        lease: TimeDelta,
    ) -> Result<Vec<(WorkerKey, Option<String>)>> {
        let mut evicted = Vec::new();

        for key in self.workers.expired(now, lease) {
            let requeued = self.unregister_worker(&key)?;
            evicted.push((key, requeued));
        }

        Ok(evicted)
    }

    // =============================================================================
    // Diagnostics
    // =============================================================================

    pub fn exit_flag(&self) -> bool {
        self.exit_flag
    }

    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            exit_flag: self.exit_flag,
            submissions_closed: self.submissions_closed,
            workers: self.workers.len(),
            tasks: self.tasks.counts(),
            queue_depth: self.queue.len(),
        }
    }

    pub fn list_tasks(&self) -> Vec<TaskSnapshot> {
        self.tasks.list()
    }

    pub fn list_workers(&self) -> Vec<WorkerSummary> {
        self.workers.list()
    }
}
