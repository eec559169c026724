//! Execution service
//!
//! Turns an assigned task into a result: decode the call with the codec,
//! look the function up, run it (bounded by the task timeout) and encode
//! the return value. Every failure becomes a failed [`TaskResult`] with one
//! of the error ids below; execution itself never errors.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pilot_core::codec::Codec;
use pilot_core::domain::task::{TaskDefn, TaskResult};
use pilot_core::domain::worker::WorkerProcessId;
use tracing::{debug, warn};

use crate::service::functions::FunctionRegistry;

pub const DECODE_ERROR: &str = "DecodeError";
pub const UNKNOWN_FUNCTION: &str = "UnknownFunction";
pub const EXECUTION_ERROR: &str = "ExecutionError";
pub const TIMEOUT: &str = "Timeout";

/// Service trait for executing tasks
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Runs a task and produces the result to report
    async fn execute(&self, task: &TaskDefn, process_id: &WorkerProcessId) -> TaskResult;
}

/// Standard implementation of ExecutionService
pub struct StandardExecutionService {
    codec: Arc<dyn Codec>,
    functions: FunctionRegistry,
    timeout: Option<Duration>,
}

impl StandardExecutionService {
    pub fn new(codec: Arc<dyn Codec>, functions: FunctionRegistry, timeout: Option<Duration>) -> Self {
        Self {
            codec,
            functions,
            timeout,
        }
    }
}

#[async_trait]
impl ExecutionService for StandardExecutionService {
    async fn execute(&self, task: &TaskDefn, process_id: &WorkerProcessId) -> TaskResult {
        let failed = |error_id: &str, error: String| {
            warn!("Task {} failed ({}): {}", task.task_id, error_id, error);
            TaskResult::failed(task.task_id.clone(), process_id.clone(), error_id, error)
        };

        let call = match self.codec.decode_task(task) {
            Ok(call) => call,
            Err(e) => return failed(DECODE_ERROR, e.to_string()),
        };

        let Some(function) = self.functions.get(&call.function) else {
            return failed(
                UNKNOWN_FUNCTION,
                format!("function '{}' is not registered", call.function),
            );
        };

        debug!("Task {}: calling {}", task.task_id, call.function);

        let invocation = function.call(call.args, call.kwargs);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(outcome) => outcome,
                Err(_) => return failed(TIMEOUT, format!("task exceeded {:?}", limit)),
            },
            None => invocation.await,
        };

        let value = match outcome {
            Ok(value) => value,
            Err(e) => return failed(EXECUTION_ERROR, format!("{:#}", e)),
        };

        match self.codec.encode_value(&value) {
            Ok(bytes) => TaskResult::succeeded(task.task_id.clone(), process_id.clone(), bytes),
            Err(e) => failed(
                EXECUTION_ERROR,
                format!("return value could not be encoded: {}", e),
            ),
        }
    }
}
