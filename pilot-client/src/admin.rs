//! Administrative endpoints

use pilot_core::domain::worker::WorkerSummary;
use pilot_core::dto::status::CoordinatorStatus;

use crate::PilotClient;
use crate::error::Result;

impl PilotClient {
    // =============================================================================
    // Workers
    // =============================================================================

    /// List all registered workers
    pub async fn list_workers(&self) -> Result<Vec<WorkerSummary>> {
        let response = self.client.get(self.url("/workers")).send().await?;

        self.handle_response(response).await
    }

    /// Force-unregister a worker, requeueing its task
    pub async fn evict_worker(&self, kind: &str, name: &str) -> Result<()> {
        let url = self.resource_url(&["workers", kind, name])?;
        let response = self.client.delete(url).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Coordinator
    // =============================================================================

    pub async fn status(&self) -> Result<CoordinatorStatus> {
        let response = self.client.get(self.url("/status")).send().await?;

        self.handle_response(response).await
    }

    /// Raise the exit flag; all workers leave on their next poll
    pub async fn set_exit_flag(&self) -> Result<CoordinatorStatus> {
        let response = self.client.post(self.url("/admin/exit")).send().await?;

        self.handle_response(response).await
    }

    /// Stop accepting submissions; the exit flag follows once all tasks finish
    pub async fn close_submissions(&self) -> Result<CoordinatorStatus> {
        let response = self.client.post(self.url("/admin/close")).send().await?;

        self.handle_response(response).await
    }

    /// Returns true if the coordinator answers its health check
    pub async fn health(&self) -> Result<bool> {
        let response = self.client.get(self.url("/health")).send().await?;
        Ok(response.status().is_success())
    }
}
