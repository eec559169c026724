//! Pilot Core
//!
//! Core types and abstractions shared by the Pilot coordinator, workers and drivers.
//!
//! This crate contains:
//! - Domain types: workers, tasks and their lifecycle states
//! - DTOs: protocol messages exchanged over the coordinator RPC surface
//! - Codec: the abstraction used to turn callables and values into opaque payloads

pub mod bytes;
pub mod codec;
pub mod domain;
pub mod dto;
