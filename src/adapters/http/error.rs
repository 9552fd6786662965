//! JSON error envelopes.

use crate::error::RelayError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::any::Any;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::Transport { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            RelayError::Staging(_) | RelayError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures that happened before anything was handed to a provider.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Render the envelope. `details` is only filled when `expose_details`.
    pub fn into_response_with(self, expose_details: bool) -> Response {
        let status = self.status();
        let details = expose_details.then(|| format!("{:?}", self));

        let body = match self {
            RelayError::InvalidInput { error, message } => ErrorBody {
                error: error.to_string(),
                message,
                details: None,
            },
            RelayError::PayloadTooLarge { limit } => ErrorBody {
                error: "File too large".to_string(),
                message: format!("Video exceeds the upload limit of {} bytes", limit),
                details: None,
            },
            RelayError::Transport { message, .. } => ErrorBody {
                error: "Invalid upload".to_string(),
                message,
                details: None,
            },
            RelayError::Staging(err) => ErrorBody {
                error: "Processing failed".to_string(),
                message: format!("Failed to stage upload: {}", err),
                details,
            },
            RelayError::Provider(err) => ErrorBody {
                error: "Processing failed".to_string(),
                message: err.to_string(),
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Route not found" })),
    )
        .into_response()
}

/// Envelope for a handler that panicked.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>, expose_details: bool) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "request handler panicked");

    let message = if expose_details {
        detail
    } else {
        "Something went wrong".to_string()
    };

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "Internal server error".to_string(),
            message,
            details: None,
        }),
    )
        .into_response()
}
