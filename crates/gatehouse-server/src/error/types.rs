//! API error types.

use axum::http::StatusCode;
use gatehouse_authz::AuthzError;
use thiserror::Error;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// API error enum covering all error cases.
#[derive(Debug, Error)]
pub enum ApiError {
    // 400 Bad Request
    #[error("Bad request: {0}")]
    BadRequest(String),

    // 401 Unauthorized
    #[error("Authentication required")]
    Unauthorized,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    // 403 Forbidden
    #[error("Access denied")]
    Forbidden,

    // 404 Not Found
    #[error("{0} not found")]
    NotFound(String),

    // 500 Internal Server Error
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),

    // 502 Bad Gateway
    #[error("Upstream service error: {0}")]
    UpstreamError(String),
}

impl ApiError {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::TokenExpired | Self::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Get error code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::TokenExpired => "token_expired",
            Self::InvalidToken => "invalid_token",
            Self::Forbidden => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
            Self::UpstreamError(_) => "upstream_error",
        }
    }

    /// Check if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InvalidIdentity(reason) => ApiError::BadRequest(reason),
            AuthzError::MissingIdentifier { kind } => ApiError::NotFound(kind),
            err @ AuthzError::Transport { .. } => ApiError::UpstreamError(err.to_string()),
            err => ApiError::Internal(err.into()),
        }
    }
}
