use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use moodlog_core::error::{self, ApiError};

/// Internal error type that converts to structured API responses.
///
/// Analysis failures are not represented here: they degrade to fallback results.
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Caller identity missing or malformed (401)
    Unauthorized {
        message: String,
        docs_hint: Option<String>,
    },
    /// Resource not found, or not owned by the caller (404)
    NotFound { resource: String },
    /// Database error (500)
    Database(sqlx::Error),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
            received: None,
            docs_hint: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Unauthorized { message, docs_hint } => (
                StatusCode::UNAUTHORIZED,
                ApiError {
                    error: error::codes::UNAUTHORIZED.to_string(),
                    message,
                    field: None,
                    received: None,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("{resource} not found"),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::Database(err) => {
                tracing::error!(request_id = %request_id, "Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}
