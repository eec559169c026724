//! Coordinator Service
//!
//! Every operation takes the state lock once, so each call is atomic with
//! respect to the registries, the queue and the flags. Nothing here awaits
//! while holding the lock.

use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use pilot_core::domain::task::{TaskDefn, TaskResult, TaskSnapshot, TaskState};
use pilot_core::domain::worker::{WorkerKey, WorkerProcessId, WorkerSummary};
use pilot_core::dto::assignment::TaskAssignment;
use pilot_core::dto::status::CoordinatorStatus;

use crate::error::{CoordinatorError, Result};
use crate::state::{CoordinatorState, KindRouting};

const MAX_FIELD_LEN: usize = 255;

#[derive(Debug)]
pub struct Coordinator {
    state: Mutex<CoordinatorState>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(KindRouting::default())
    }
}

impl Coordinator {
    pub fn new(routing: KindRouting) -> Self {
        Self {
            state: Mutex::new(CoordinatorState::new(routing)),
        }
    }

    // =============================================================================
    // Worker Protocol
    // =============================================================================

    pub fn register_worker(&self, process_id: WorkerProcessId) -> Result<()> {
        validate_process_id(&process_id)?;

        let label = process_id.to_string();
        self.state.lock().register_worker(process_id, Utc::now())?;

        tracing::info!("Worker registered: {}", label);
        Ok(())
    }

    pub fn unregister_worker(&self, process_id: &WorkerProcessId) -> Result<()> {
        let key = process_id.key();
        let requeued = self
            .state
            .lock()
            .unregister_process(process_id)
            .inspect_err(|e| {
                if let CoordinatorError::ProcessMismatch { holder, .. } = e {
                    tracing::warn!(
                        "Ignoring unregister of {} from {}: key held by {}",
                        key,
                        process_id,
                        holder
                    );
                }
            })?;

        match requeued {
            Some(task_id) => {
                tracing::info!("Worker unregistered: {} (task {} requeued)", key, task_id)
            }
            None => tracing::info!("Worker unregistered: {}", key),
        }
        Ok(())
    }

    pub fn heartbeat(&self, process_id: &WorkerProcessId) -> Result<()> {
        let key = process_id.key();
        self.state.lock().heartbeat(&key, Utc::now())?;

        tracing::debug!("Heartbeat from worker: {}", key);
        Ok(())
    }

    pub fn next_task(&self, process_id: &WorkerProcessId) -> Result<TaskAssignment> {
        let assignment = self.state.lock().next_task(process_id, Utc::now())?;

        match &assignment.task {
            Some(task) => tracing::info!(
                "Task {} assigned to worker {}",
                task.task_id,
                process_id.key()
            ),
            None if assignment.exit_flag => {
                tracing::debug!("Exit flag delivered to worker {}", process_id.key())
            }
            None => tracing::debug!("No task available for worker {}", process_id.key()),
        }

        Ok(assignment)
    }

    pub fn set_task_result(&self, result: TaskResult) -> Result<TaskState> {
        let task_id = result.task_id.clone();
        let reporter = result.process_id.key();

        let (state, exit_raised) = {
            let mut guard = self.state.lock();
            let exit_before = guard.exit_flag();
            let state = guard.set_task_result(result, Utc::now())?;
            (state, !exit_before && guard.exit_flag())
        };

        tracing::info!(
            "Task {} reported {} by worker {}",
            task_id,
            state,
            reporter
        );
        if exit_raised {
            tracing::info!("All tasks finished after close, exit flag raised");
        }

        Ok(state)
    }

    // =============================================================================
    // Driver Operations
    // =============================================================================

    pub fn submit(&self, defn: TaskDefn) -> Result<TaskSnapshot> {
        validate_task(&defn)?;

        let snapshot = self.state.lock().submit(defn, Utc::now())?;

        tracing::info!("Task submitted: {}", snapshot.task_id);
        Ok(snapshot)
    }

    pub fn poll(&self, task_id: &str) -> Result<TaskSnapshot> {
        self.state.lock().poll(task_id)
    }

    pub fn list_tasks(&self) -> Vec<TaskSnapshot> {
        self.state.lock().list_tasks()
    }

    pub fn list_workers(&self) -> Vec<WorkerSummary> {
        self.state.lock().list_workers()
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.state.lock().status()
    }

    /// Raises the exit flag and returns the resulting status
    pub fn set_exit_flag(&self) -> CoordinatorStatus {
        let mut state = self.state.lock();
        if state.set_exit_flag() {
            tracing::info!("Exit flag raised");
        }
        state.status()
    }

    /// Closes submissions and returns the resulting status
    pub fn close_submissions(&self) -> CoordinatorStatus {
        let mut state = self.state.lock();
        tracing::info!("Task submissions closed");
        if state.close_submissions() {
            tracing::info!("No unfinished tasks, exit flag raised");
        }
        state.status()
    }

    /// Operator-forced unregistration
    pub fn evict_worker(&self, key: &WorkerKey) -> Result<Option<String>> {
        let requeued = self.state.lock().unregister_worker(key)?;

        tracing::warn!(
            "Worker {} evicted{}",
            key,
            requeued
                .as_ref()
                .map(|id| format!(", task {} requeued", id))
                .unwrap_or_default()
        );
        Ok(requeued)
    }

    /// Unregisters workers that have been silent for longer than `lease`
    ///
    /// Returns how many workers were evicted.
    pub fn expire_workers(&self, lease: TimeDelta) -> Result<usize> {
        let evicted = self.state.lock().expire_workers(Utc::now(), lease)?;

        for (key, requeued) in &evicted {
            match requeued {
                Some(task_id) => tracing::warn!(
                    "Worker {} lease expired, task {} requeued",
                    key,
                    task_id
                ),
                None => tracing::warn!("Worker {} lease expired", key),
            }
        }

        Ok(evicted.len())
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_process_id(process_id: &WorkerProcessId) -> Result<()> {
    for (field, value) in [("kind", &process_id.kind), ("name", &process_id.name)] {
        if value.trim().is_empty() {
            return Err(CoordinatorError::ValidationError(format!(
                "Worker {} cannot be empty",
                field
            )));
        }

        if value.len() > MAX_FIELD_LEN {
            return Err(CoordinatorError::ValidationError(format!(
                "Worker {} is too long (max {} characters)",
                field, MAX_FIELD_LEN
            )));
        }

        if is_dot_segment(value) {
            return Err(CoordinatorError::ValidationError(format!(
                "Worker {} cannot be '{}'",
                field, value
            )));
        }
    }

    Ok(())
}

fn validate_task(defn: &TaskDefn) -> Result<()> {
    if defn.task_id.trim().is_empty() {
        return Err(CoordinatorError::ValidationError(
            "Task ID cannot be empty".to_string(),
        ));
    }

    if defn.task_id.len() > MAX_FIELD_LEN {
        return Err(CoordinatorError::ValidationError(format!(
            "Task ID is too long (max {} characters)",
            MAX_FIELD_LEN
        )));
    }

    if is_dot_segment(&defn.task_id) {
        return Err(CoordinatorError::ValidationError(format!(
            "Task ID cannot be '{}'",
            defn.task_id
        )));
    }

    Ok(())
}

/// `.` and `..` cannot be addressed as a URL path segment
fn is_dot_segment(value: &str) -> bool {
    matches!(value, "." | "..")
}
