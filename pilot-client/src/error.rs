//! Error types for the Pilot client

use pilot_core::dto::error::{ErrorBody, ErrorCode};
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Pilot client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connection refused, timeout, ...)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The coordinator answered with an error status
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error code from the response body, if it carried one
        code: Option<ErrorCode>,
        /// Error message from the coordinator
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The coordinator URL cannot carry a resource path
    #[error("Invalid coordinator URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Create an API error from a status code and the raw response body
    ///
    /// Bodies in the coordinator's `{"error", "code"}` shape are unpacked;
    /// anything else is kept verbatim as the message.
    pub fn api_error(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();

        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => Self::Api {
                status,
                code: Some(parsed.code),
                message: parsed.error,
            },
            Err(_) => Self::Api {
                status,
                code: None,
                message: body,
            },
        }
    }

    /// The coordinator's error code, if any
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { code, .. } => *code,
            _ => None,
        }
    }

    pub fn is_not_registered(&self) -> bool {
        self.code() == Some(ErrorCode::NotRegistered)
    }

    pub fn is_already_registered(&self) -> bool {
        self.code() == Some(ErrorCode::AlreadyRegistered)
    }

    /// The task is no longer held by the reporter (stale or duplicate result)
    pub fn is_not_assigned(&self) -> bool {
        self.code() == Some(ErrorCode::NotAssigned)
    }

    pub fn is_unknown_task(&self) -> bool {
        self.code() == Some(ErrorCode::UnknownTaskId)
    }

    /// The request may not have reached the coordinator; retrying is safe
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::RequestFailed(_))
            || matches!(self, Self::Api { status: 502..=504, .. })
    }
}
