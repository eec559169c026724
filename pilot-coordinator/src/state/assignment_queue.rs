//! Assignment Queue
//!
//! Orders PENDING tasks by submission sequence and hands the oldest eligible
//! one to a requesting worker. Tasks are kept in one lane per kind tag so
//! filtered lookups only look at the heads of the relevant lanes.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Lane of tasks submitted without a kind tag
const UNTAGGED: &str = "";

/// How task kinds restrict which workers may receive a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KindRouting {
    /// Tagged tasks only go to workers of the same kind; untagged tasks go anywhere
    #[default]
    Strict,

    /// Kinds are ignored, one global FIFO
    Off,
}

impl FromStr for KindRouting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(KindRouting::Strict),
            "off" | "none" | "disabled" => Ok(KindRouting::Off),
            other => Err(format!(
                "unknown kind routing '{}' (expected 'strict' or 'off')",
                other
            )),
        }
    }
}

#[derive(Debug)]
pub struct AssignmentQueue {
    routing: KindRouting,
    lanes: HashMap<String, BTreeMap<u64, String>>,
    len: usize,
}

impl AssignmentQueue {
    pub fn new(routing: KindRouting) -> Self {
        Self {
            routing,
            lanes: HashMap::new(),
            len: 0,
        }
    }

    /// Enqueues a task at its submission sequence number
    ///
    /// Requeued tasks come back with their original number and therefore
    /// precede everything submitted after them.
    pub fn push(&mut self, seq: u64, task_id: String, kind: &str) {
        let previous = self
            .lanes
            .entry(kind.to_string())
            .or_default()
            .insert(seq, task_id);

        if previous.is_none() {
            self.len += 1;
        }
    }

    /// Removes and returns the oldest task the given worker kind may run
    pub fn pop_for(&mut self, worker_kind: &str) -> Option<String> {
        let lane = match self.routing {
            KindRouting::Strict => [UNTAGGED, worker_kind]
                .into_iter()
                .filter_map(|kind| self.head_of(kind).map(|seq| (seq, kind)))
                .min()
                .map(|(_, kind)| kind.to_string()),
            KindRouting::Off => self
                .lanes
                .iter()
                .filter_map(|(kind, lane)| lane.first_key_value().map(|(seq, _)| (*seq, kind)))
                .min()
                .map(|(_, kind)| kind.clone()),
        }?;

        let queue = self.lanes.get_mut(&lane)?;
        let (_, task_id) = queue.pop_first()?;
        if queue.is_empty() {
            self.lanes.remove(&lane);
        }
        self.len -= 1;

        Some(task_id)
    }

    fn head_of(&self, kind: &str) -> Option<u64> {
        self.lanes
            .get(kind)
            .and_then(|lane| lane.first_key_value())
            .map(|(seq, _)| *seq)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
