//! Error DTOs
//!
//! Every failed coordinator call answers with an [`ErrorBody`]. The `code`
//! lets callers tell tolerable protocol races apart from real failures.

use serde::{Deserialize, Serialize};

/// Machine-readable class of a coordinator error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    AlreadyRegistered,
    NotRegistered,
    DuplicateTaskId,
    UnknownTaskId,
    NotAssigned,
    SubmissionsClosed,
    InvalidRequest,
    Internal,
}

impl ErrorCode {
    /// Protocol/state errors callers are expected to tolerate
    pub fn is_soft(self) -> bool {
        matches!(
            self,
            ErrorCode::NotRegistered | ErrorCode::NotAssigned | ErrorCode::UnknownTaskId
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// JSON body of an error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: ErrorCode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            error: "Worker cpu/w0 is not registered".to_string(),
            code: ErrorCode::NotRegistered,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "NotRegistered");
    }

    #[test]
    fn test_soft_codes() {
        assert!(ErrorCode::NotAssigned.is_soft());
        assert!(!ErrorCode::AlreadyRegistered.is_soft());
        assert!(!ErrorCode::Internal.is_soft());
    }
}
