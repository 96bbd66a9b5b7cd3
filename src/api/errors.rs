use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::errors::DomainError;
use crate::services::render::RenderError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    NotFound(String),
    Conflict(String),
    UnprocessableEntity(String),
    TooManyRequests(&'static str),
    ServiceUnavailable(String),
    GatewayTimeout(&'static str),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(message) | DomainError::Reference(message) => {
                Self::UnprocessableEntity(message)
            }
            DomainError::NotFound(entity) => Self::NotFound(format!("{entity} not found")),
            DomainError::Permission(message) => Self::Forbidden(message),
            DomainError::StateConflict(message) => Self::Conflict(message),
            DomainError::Database(err) => Self::internal(err, "Database operation failed"),
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Unavailable => {
                Self::ServiceUnavailable("Render queue is unavailable".to_string())
            }
            RenderError::UnknownHandle => Self::NotFound("Render result not found".to_string()),
            RenderError::Timeout => Self::GatewayTimeout("Render did not finish in time"),
            RenderError::Failed => Self::Internal("Render failed".to_string()),
            RenderError::Backend(err) => Self::internal(err, "Render queue request failed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => json_error(StatusCode::FORBIDDEN, message.to_string()),
            ApiError::NotFound(message) => json_error(StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => json_error(StatusCode::CONFLICT, message),
            ApiError::UnprocessableEntity(message) => {
                json_error(StatusCode::UNPROCESSABLE_ENTITY, message)
            }
            ApiError::TooManyRequests(message) => {
                json_error(StatusCode::TOO_MANY_REQUESTS, message.to_string())
            }
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                json_error(StatusCode::SERVICE_UNAVAILABLE, message)
            }
            ApiError::GatewayTimeout(message) => {
                tracing::warn!(error = %message, "Gateway timeout");
                json_error(StatusCode::GATEWAY_TIMEOUT, message.to_string())
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

fn json_error(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response()
}
