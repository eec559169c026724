//! Service Module
//!
//! Business logic layer for the coordinator.
//! Wraps the in-memory state behind one lock and adds validation and logging.

pub mod coordinator;
pub mod lease;

pub use coordinator::Coordinator;
