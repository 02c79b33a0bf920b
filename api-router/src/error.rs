use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::AppError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Answer generation failed: {0}")]
    DraftFailed(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::Completion(msg) => Self::DraftFailed(msg),
            AppError::OpenAI(_) | AppError::LLMParsing(_) => {
                tracing::error!("Draft generation error: {:?}", err);
                Self::DraftFailed(err.to_string())
            }
            _ => {
                tracing::error!("Internal error: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::InternalError(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "internal server error".to_string(),
                    details,
                },
            ),
            Self::ValidationError(details) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "validation error".to_string(),
                    details,
                },
            ),
            Self::DraftFailed(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "answer generation failed".to_string(),
                    details,
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    details: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Debug;

    fn assert_status_code<T: IntoResponse + Debug>(response: T, expected_status: StatusCode) {
        let response = response.into_response();
        assert_eq!(response.status(), expected_status);
    }

    #[test]
    fn test_app_error_to_api_error_conversion() {
        let validation = AppError::Validation("invalid input".to_string());
        let api_error = ApiError::from(validation);
        assert!(matches!(api_error, ApiError::ValidationError(msg) if msg == "invalid input"));

        let draft = AppError::Completion("provider unreachable".to_string());
        let api_error = ApiError::from(draft);
        assert!(matches!(api_error, ApiError::DraftFailed(msg) if msg == "provider unreachable"));

        let internal = AppError::Io(std::io::Error::other("io error"));
        let api_error = ApiError::from(internal);
        assert!(matches!(api_error, ApiError::InternalError(_)));
    }

    #[test]
    fn test_api_error_response_status_codes() {
        let error = ApiError::InternalError("server error".to_string());
        assert_status_code(error, StatusCode::INTERNAL_SERVER_ERROR);

        let error = ApiError::ValidationError("invalid input".to_string());
        assert_status_code(error, StatusCode::BAD_REQUEST);

        let error = ApiError::DraftFailed("provider down".to_string());
        assert_status_code(error, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_sanitization() {
        let sensitive_info = "db password incorrect";
        let api_error = ApiError::InternalError(sensitive_info.to_string());

        // the display form never carries the detail
        assert_eq!(api_error.to_string(), "Internal server error");
        assert_status_code(api_error, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
