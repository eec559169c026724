//! Pilot coordinator
//!
//! Hands out tasks to a pool of pilot workers over HTTP and collects their
//! results.

pub mod api;
pub mod config;
pub mod error;
pub mod service;
pub mod state;
