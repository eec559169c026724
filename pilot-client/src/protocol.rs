//! Worker protocol endpoints

use pilot_core::domain::task::TaskResult;
use pilot_core::domain::worker::WorkerProcessId;
use pilot_core::dto::assignment::TaskAssignment;

use crate::PilotClient;
use crate::error::Result;

impl PilotClient {
    /// Register this worker process with the coordinator
    ///
    /// Fails with `AlreadyRegistered` if another live process holds the
    /// same (kind, name).
    pub async fn register_worker(&self, process_id: &WorkerProcessId) -> Result<()> {
        let response = self
            .client
            .post(self.url("/rpc/RegisterWorkerProcess"))
            .json(process_id)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Unregister this worker; any task it holds goes back to the queue
    pub async fn unregister_worker(&self, process_id: &WorkerProcessId) -> Result<()> {
        let response = self
            .client
            .post(self.url("/rpc/UnregisterWorkerProcess"))
            .json(process_id)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Ask for the next task
    ///
    /// Returns immediately: with a task, with nothing to do, or with the
    /// exit flag set.
    pub async fn get_next_task(&self, process_id: &WorkerProcessId) -> Result<TaskAssignment> {
        let response = self
            .client
            .post(self.url("/rpc/GetNextTask"))
            .json(process_id)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Report the outcome of the task this worker holds
    pub async fn set_task_result(&self, result: &TaskResult) -> Result<()> {
        let response = self
            .client
            .post(self.url("/rpc/SetTaskResult"))
            .json(result)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Renew this worker's lease
    pub async fn heartbeat(&self, process_id: &WorkerProcessId) -> Result<()> {
        let response = self
            .client
            .post(self.url("/rpc/Heartbeat"))
            .json(process_id)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
