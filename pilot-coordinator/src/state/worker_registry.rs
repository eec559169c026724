//! Worker Registry
//!
//! Tracks the currently registered pilot workers, keyed by (kind, name).

use chrono::{DateTime, TimeDelta, Utc};
use pilot_core::domain::worker::{WorkerKey, WorkerProcessId, WorkerSummary};
use std::collections::HashMap;

use crate::error::{CoordinatorError, Result};

/// A registered (ACTIVE) worker
#[derive(Debug, Clone)]
pub struct WorkerEntry {
    pub process_id: WorkerProcessId,
    pub registered_at: DateTime<Utc>,

    /// Renewed by every protocol call from this worker
    pub last_seen_at: DateTime<Utc>,

    /// The one task this worker currently holds
    pub assigned_task: Option<String>,

    pub tasks_completed: u64,
}

impl WorkerEntry {
    pub fn summary(&self) -> WorkerSummary {
        WorkerSummary {
            process_id: self.process_id.clone(),
            registered_at: self.registered_at,
            last_seen_at: self.last_seen_at,
            assigned_task: self.assigned_task.clone(),
            tasks_completed: self.tasks_completed,
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: HashMap<WorkerKey, WorkerEntry>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a worker; a live entry under the same key is never replaced
    pub fn register(&mut self, process_id: WorkerProcessId, now: DateTime<Utc>) -> Result<()> {
        let key = process_id.key();

        if let Some(existing) = self.workers.get(&key) {
            tracing::warn!(
                "Rejecting registration of {}: key already held by {}",
                process_id,
                existing.process_id
            );
            return Err(CoordinatorError::AlreadyRegistered(key));
        }

        self.workers.insert(
            key,
            WorkerEntry {
                process_id,
                registered_at: now,
                last_seen_at: now,
                assigned_task: None,
                tasks_completed: 0,
            },
        );

        Ok(())
    }

    /// Removes a worker and returns its last entry
    pub fn unregister(&mut self, key: &WorkerKey) -> Result<WorkerEntry> {
        self.workers
            .remove(key)
            .ok_or_else(|| CoordinatorError::NotRegistered(key.clone()))
    }

    /// Removes a worker on its own request
    ///
    /// Only the process that registered may remove the entry: a late call
    /// from an earlier process under the same key leaves its successor alone.
    pub fn unregister_process(&mut self, process_id: &WorkerProcessId) -> Result<WorkerEntry> {
        let key = process_id.key();

        match self.workers.get(&key) {
            None => return Err(CoordinatorError::NotRegistered(key)),
            Some(entry) if entry.process_id != *process_id => {
                return Err(CoordinatorError::ProcessMismatch {
                    worker: key,
                    holder: entry.process_id.to_string(),
                });
            }
            Some(_) => {}
        }

        self.unregister(&key)
    }

    pub fn get(&self, key: &WorkerKey) -> Option<&WorkerEntry> {
        self.workers.get(key)
    }

    pub fn get_mut(&mut self, key: &WorkerKey) -> Option<&mut WorkerEntry> {
        self.workers.get_mut(key)
    }

    /// Renews the worker's lease; false if it is not registered
    pub fn touch(&mut self, key: &WorkerKey, now: DateTime<Utc>) -> bool {
        match self.workers.get_mut(key) {
            Some(entry) => {
                entry.last_seen_at = entry.last_seen_at.max(now);
                true
            }
            None => false,
        }
    }

    /// Workers whose last call is older than `lease`
    pub fn expired(&self, now: DateTime<Utc>, lease: TimeDelta) -> Vec<WorkerKey> {
        let mut keys: Vec<WorkerKey> = self
            .workers
            .iter()
            .filter(|(_, entry)| now - entry.last_seen_at > lease)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Summaries of all workers, sorted by key
    pub fn list(&self) -> Vec<WorkerSummary> {
        let mut entries: Vec<(&WorkerKey, &WorkerEntry)> = self.workers.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, entry)| entry.summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(name: &str, pid: u32) -> WorkerProcessId {
        let mut id = WorkerProcessId::new("cpu", name);
        id.hostname = "node-1".to_string();
        id.pid = pid;
        id
    }

    #[test]
    fn test_register_rejects_live_duplicate() {
        let mut registry = WorkerRegistry::new();
        registry.register(worker("w0", 100), Utc::now()).unwrap();

        // Same key from another process
        let result = registry.register(worker("w0", 200), Utc::now());
        assert_eq!(
            result,
            Err(CoordinatorError::AlreadyRegistered(WorkerKey::new("cpu", "w0")))
        );

        // The original registration is untouched
        let entry = registry.get(&WorkerKey::new("cpu", "w0")).unwrap();
        assert_eq!(entry.process_id.pid, 100);
    }

    #[test]
    fn test_same_name_different_kind() {
        let mut registry = WorkerRegistry::new();
        registry.register(worker("w0", 1), Utc::now()).unwrap();
        registry
            .register(WorkerProcessId::new("gpu", "w0"), Utc::now())
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unregister_twice() {
        let mut registry = WorkerRegistry::new();
        let key = WorkerKey::new("cpu", "w0");
        registry.register(worker("w0", 1), Utc::now()).unwrap();

        assert!(registry.unregister(&key).is_ok());
        assert_eq!(
            registry.unregister(&key).unwrap_err(),
            CoordinatorError::NotRegistered(key)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_from_previous_process_is_refused() {
        let mut registry = WorkerRegistry::new();
        registry.register(worker("w0", 200), Utc::now()).unwrap();

        let result = registry.unregister_process(&worker("w0", 100));
        assert!(matches!(
            result,
            Err(CoordinatorError::ProcessMismatch { ref holder, .. }) if holder.contains("200")
        ));
        assert_eq!(registry.len(), 1);

        let entry = registry.unregister_process(&worker("w0", 200)).unwrap();
        assert_eq!(entry.process_id.pid, 200);
        assert_eq!(
            registry.unregister_process(&worker("w0", 200)).unwrap_err(),
            CoordinatorError::NotRegistered(WorkerKey::new("cpu", "w0"))
        );
    }

    #[test]
    fn test_reregister_after_unregister() {
        let mut registry = WorkerRegistry::new();
        registry.register(worker("w0", 1), Utc::now()).unwrap();
        registry.unregister(&WorkerKey::new("cpu", "w0")).unwrap();

        assert!(registry.register(worker("w0", 2), Utc::now()).is_ok());
    }

    #[test]
    fn test_expired_respects_touch() {
        let mut registry = WorkerRegistry::new();
        let start = Utc::now();
        registry.register(worker("w0", 1), start).unwrap();
        registry.register(worker("w1", 2), start).unwrap();

        let later = start + TimeDelta::seconds(30);
        assert!(registry.touch(&WorkerKey::new("cpu", "w1"), later));

        let expired = registry.expired(later + TimeDelta::seconds(5), TimeDelta::seconds(20));
        assert_eq!(expired, vec![WorkerKey::new("cpu", "w0")]);

        assert!(!registry.touch(&WorkerKey::new("cpu", "missing"), later));
    }

    #[test]
    fn test_list_sorted_by_key() {
        let mut registry = WorkerRegistry::new();
        registry.register(worker("w2", 1), Utc::now()).unwrap();
        registry.register(worker("w1", 2), Utc::now()).unwrap();

        let names: Vec<_> = registry
            .list()
            .into_iter()
            .map(|summary| summary.process_id.name)
            .collect();
        assert_eq!(names, vec!["w1", "w2"]);
    }
}
