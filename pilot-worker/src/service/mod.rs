//! Service layer
//!
//! Task execution for the worker. Services are trait-based so the
//! scheduler can be driven by a stub in tests.

pub mod execution;
pub mod functions;

pub use execution::{ExecutionService, StandardExecutionService};
pub use functions::FunctionRegistry;
