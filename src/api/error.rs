use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

use crate::queue::ServiceError;
use crate::task::TaskStatus;

use super::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid source URL: {0}")]
    InvalidUrl(String),
    #[error("unsupported language: {0}")]
    InvalidLanguage(String),
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("operation not allowed while task is {0}")]
    StateConflict(TaskStatus),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidLanguage(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::StateConflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidUrl(_) => "INVALID_URL",
            ApiError::InvalidLanguage(_) => "INVALID_LANGUAGE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::StateConflict(_) => "STATE_CONFLICT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(json!(body))).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::InvalidUrl(err) => ApiError::InvalidUrl(err.0),
            ServiceError::UnsupportedLanguage(lang) => ApiError::InvalidLanguage(lang),
            ServiceError::NotFound(id) => ApiError::NotFound(id),
            ServiceError::InvalidState { current } => ApiError::StateConflict(current),
            ServiceError::Store(err) => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_http_statuses() {
        let err: ApiError = ServiceError::NotFound("42".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: ApiError = ServiceError::InvalidState {
            current: TaskStatus::Running,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "STATE_CONFLICT");

        let err: ApiError = ServiceError::UnsupportedLanguage("fr-FR".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
