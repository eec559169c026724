//! Task submission and polling endpoints

use pilot_core::domain::task::{TaskDefn, TaskSnapshot};

use crate::PilotClient;
use crate::error::Result;

impl PilotClient {
    /// Submit a task; the returned snapshot shows it PENDING
    pub async fn submit_task(&self, task: &TaskDefn) -> Result<TaskSnapshot> {
        let response = self
            .client
            .post(self.url("/tasks"))
            .json(task)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the current state (and result, once terminal) of a task
    pub async fn get_task(&self, task_id: &str) -> Result<TaskSnapshot> {
        let url = self.resource_url(&["tasks", task_id])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    /// List all tasks in submission order
    pub async fn list_tasks(&self) -> Result<Vec<TaskSnapshot>> {
        let response = self.client.get(self.url("/tasks")).send().await?;

        self.handle_response(response).await
    }
}
