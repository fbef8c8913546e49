//! HTTP error responses

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Request-level failures, each mapped to one HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Signature header missing or wrong
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body is not valid JSON
    #[error("Invalid webhook payload")]
    InvalidPayload,

    /// Anything but POST on the webhook path
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Body exceeded the configured ceiling, or could not be read
    #[error("Payload too large")]
    PayloadTooLarge,

    /// Unknown path
    #[error("Not found")]
    NotFound,
}

/// `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidSignature => StatusCode::UNAUTHORIZED,
            ApiError::InvalidPayload => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => {
                // No body; the connection is dropped after this response.
                return (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    [(header::CONNECTION, "close")],
                )
                    .into_response();
            }
        };

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
