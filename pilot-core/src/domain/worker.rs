//! Worker domain model
//!
//! Identity of a pilot worker process and the coordinator's view of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of one pilot worker instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProcessId {
    /// Logical role of the worker, used for pool segmentation
    pub kind: String,

    /// Worker name, unique within a kind
    pub name: String,

    /// Enclosing batch-scheduler job (shared by every pilot in the job)
    #[serde(default)]
    pub batch_job_id: u64,

    /// Host the worker runs on
    #[serde(default)]
    pub hostname: String,

    /// Process id on that host
    #[serde(default)]
    pub pid: u32,
}

impl WorkerProcessId {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            batch_job_id: 0,
            hostname: String::new(),
            pid: 0,
        }
    }

    /// Logical key under which the coordinator tracks this worker
    pub fn key(&self) -> WorkerKey {
        WorkerKey {
            kind: self.kind.clone(),
            name: self.name.clone(),
        }
    }
}

impl std::fmt::Display for WorkerProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} ({}:{}, job {})",
            self.kind, self.name, self.hostname, self.pid, self.batch_job_id
        )
    }
}

/// The (kind, name) pair that identifies a logical worker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerKey {
    pub kind: String,
    pub name: String,
}

impl WorkerKey {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for WorkerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Diagnostic view of a registered worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSummary {
    #[serde(flatten)]
    pub process_id: WorkerProcessId,

    /// When this worker registered
    pub registered_at: DateTime<Utc>,

    /// Last protocol call received from this worker
    pub last_seen_at: DateTime<Utc>,

    /// Task currently assigned to this worker, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_task: Option<String>,

    /// Number of results this worker reported since registering
    pub tasks_completed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_process_coordinates() {
        let mut a = WorkerProcessId::new("cpu", "w0");
        a.hostname = "node-1".to_string();
        a.pid = 10;

        let mut b = WorkerProcessId::new("cpu", "w0");
        b.hostname = "node-2".to_string();
        b.pid = 20;

        assert_eq!(a.key(), b.key());
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_coordinates_default() {
        let id: WorkerProcessId = serde_json::from_str(r#"{"kind":"gpu","name":"w1"}"#).unwrap();
        assert_eq!(id.batch_job_id, 0);
        assert_eq!(id.pid, 0);
        assert!(id.hostname.is_empty());
    }

    #[test]
    fn test_summary_flattens_identity() {
        let summary = WorkerSummary {
            process_id: WorkerProcessId::new("cpu", "w0"),
            registered_at: Utc::now(),
            last_seen_at: Utc::now(),
            assigned_task: None,
            tasks_completed: 3,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["kind"], "cpu");
        assert_eq!(json["name"], "w0");
        assert!(json.get("assigned_task").is_none());
    }
}
