//! Core domain types
//!
//! This module contains the domain structures used across Pilot services.
//! The coordinator owns every instance of these at runtime; workers and
//! drivers only ever see copies carried in protocol messages.

pub mod task;
pub mod worker;
