//! Scheduler layer for the worker
//!
//! Registers with the coordinator, pulls tasks one at a time, runs them
//! and reports results until the coordinator raises the exit flag.

pub mod backoff;
pub mod poller;

pub use poller::{ExitReason, TaskPoller, register_with_retry};
