//! Pilot HTTP Client
//!
//! A type-safe HTTP client for the Pilot coordinator API, shared by the
//! pilot workers and the driver CLI.
//!
//! # Example
//!
//! ```no_run
//! use pilot_client::PilotClient;
//! use pilot_core::codec::{Call, Codec, JsonCodec};
//! use pilot_core::domain::task::TaskDefn;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PilotClient::new("http://localhost:8080");
//!
//! let call = JsonCodec.encode_call(&Call::new("sum").arg(1).arg(2))?;
//! let snapshot = client.submit_task(&call.into_task(TaskDefn::generate_id(), "")).await?;
//!
//! println!("Submitted task: {}", snapshot.task_id);
//! # Ok(())
//! # }
//! ```

pub mod error;
mod admin;
mod protocol;
mod tasks;

// Re-export commonly used types
pub use error::{ClientError, Result};

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

/// HTTP client for the Pilot coordinator API
///
/// Methods are grouped by audience:
/// - Worker protocol (register, unregister, next task, results, heartbeat)
/// - Task submission and polling
/// - Administration (workers, status, exit flag)
#[derive(Debug, Clone)]
pub struct PilotClient {
    /// Base URL of the coordinator (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl PilotClient {
    /// Create a new coordinator client
    ///
    /// # Example
    /// ```
    /// use pilot_client::PilotClient;
    ///
    /// let client = PilotClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new coordinator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create a client whose requests time out after `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Get the base URL of the coordinator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a resource URL from raw path segments
    ///
    /// Each segment is percent-encoded on its own, so ids containing `/`,
    /// `?`, `#` or spaces address exactly one path parameter.
    fn resource_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{}: not a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("Coordinator returned {}: {}", status, error_text);
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is not needed
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = PilotClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/status"), "http://localhost:8080/status");
    }

    #[test]
    fn test_resource_url_encodes_each_segment() {
        let client = PilotClient::new("http://localhost:8080");

        let url = client.resource_url(&["tasks", "batch/7?x=1#frag"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/tasks/batch%2F7%3Fx=1%23frag");

        let url = client.resource_url(&["workers", "gpu", "rank 0"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/workers/gpu/rank%200");
    }

    #[test]
    fn test_resource_url_keeps_base_path() {
        let client = PilotClient::new("http://gateway/pilot/");
        let url = client.resource_url(&["tasks", "t1"]).unwrap();
        assert_eq!(url.as_str(), "http://gateway/pilot/tasks/t1");
    }

    #[test]
    fn test_resource_url_rejects_bad_base() {
        let client = PilotClient::new("not a url");
        let err = client.resource_url(&["tasks", "t1"]).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_client_with_timeout() {
        let client = PilotClient::with_timeout("http://node-1:8080", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://node-1:8080");
    }

    #[tokio::test]
    async fn test_unreachable_coordinator_is_transport_error() {
        // Port 9 (discard) is closed on test machines
        let client = PilotClient::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.status().await.unwrap_err();
        assert!(err.is_transport());
    }
}
