//! Data Transfer Objects for inter-service communication
//!
//! Messages exchanged between the coordinator, pilot workers and drivers
//! that are not domain entities in their own right.

pub mod assignment;
pub mod error;
pub mod status;
