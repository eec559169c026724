//! API Error Handling
//!
//! Renders coordinator errors as `{"error": ..., "code": ...}` responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pilot_core::dto::error::{ErrorBody, ErrorCode};

use crate::error::CoordinatorError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    Coordinator(CoordinatorError),
    BadRequest(String),
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Coordinator(err) => err.code(),
            ApiError::BadRequest(_) => ErrorCode::InvalidRequest,
        }
    }
}

/// HTTP status used for each error code
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::AlreadyRegistered
        | ErrorCode::DuplicateTaskId
        | ErrorCode::NotAssigned
        | ErrorCode::SubmissionsClosed => StatusCode::CONFLICT,
        ErrorCode::NotRegistered | ErrorCode::UnknownTaskId => StatusCode::NOT_FOUND,
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let message = match self {
            ApiError::Coordinator(err) => err.to_string(),
            ApiError::BadRequest(msg) => msg,
        };

        match code {
            ErrorCode::Internal => tracing::error!("Internal error: {}", message),
            code if code.is_soft() => tracing::warn!("{}", message),
            _ => tracing::debug!("Request rejected: {}", message),
        }

        let body = ErrorBody {
            error: message,
            code,
        };
        (status_for(code), Json(body)).into_response()
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        ApiError::Coordinator(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_core::domain::worker::WorkerKey;

    #[test]
    fn test_status_mapping() {
        let conflict = ApiError::from(CoordinatorError::AlreadyRegistered(WorkerKey::new(
            "cpu", "w0",
        )));
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let missing = ApiError::from(CoordinatorError::UnknownTaskId("t1".to_string()));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let bad = ApiError::BadRequest("missing field `kind`".to_string());
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);

        assert_eq!(
            status_for(ErrorCode::Internal),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
