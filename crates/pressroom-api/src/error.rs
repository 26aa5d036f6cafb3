//! API error responses

use axum::{http::StatusCode, Json};
use pressroom_common::Error;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine readable error code
    pub error: String,
    /// Human readable message
    pub message: String,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build an error response from parts
pub fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

/// Map any core error onto its status code and `{error, message}` body
pub fn api_error(err: impl Into<Error>) -> ApiError {
    let err = err.into();
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(code = err.code(), "Request failed: {}", err);
    } else {
        debug!(code = err.code(), "Request rejected: {}", err);
    }

    error_response(status, err.code(), message(&err))
}

fn message(err: &Error) -> String {
    match err {
        Error::Auth(msg)
        | Error::Validation(msg)
        | Error::NotFound(msg)
        | Error::PermissionDenied(msg)
        | Error::Upload(msg)
        | Error::Smtp(msg) => msg.clone(),
        Error::Provider { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

pub fn not_found(what: &str) -> ApiError {
    error_response(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} not found", what))
}

pub fn validation(message: impl Into<String>) -> ApiError {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
}
