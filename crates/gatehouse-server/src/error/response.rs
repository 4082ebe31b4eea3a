//! Error response implementation.

use super::types::ApiError;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            error!(error = %self, code = self.error_code(), "Server error occurred");
        } else if matches!(
            self,
            ApiError::Unauthorized | ApiError::InvalidToken | ApiError::Forbidden
        ) {
            warn!(error = %self, code = self.error_code(), "Auth error occurred");
        }

        let message = match &self {
            ApiError::Internal(err) => {
                if cfg!(debug_assertions) {
                    format!("{}: {}", self, err)
                } else {
                    "An internal error occurred".to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                code: self.error_code(),
                message,
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::TokenExpired,
            _ => ApiError::InvalidToken,
        }
    }
}
