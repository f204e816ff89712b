//! Client error types.

use http::StatusCode;
use thiserror::Error;

/// Convenience alias for client call results.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by the HTTP client and the typed API helpers.
///
/// Ordinary non-2xx statuses are not errors for [`crate::HttpClient::request`];
/// only the typed helpers turn them into [`ApiError::Status`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Status code carried by a [`ApiError::Status`] error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::InvalidUrl(e.to_string())
    }
}

/// Session query failures.
///
/// `Clone` so a single in-flight profile fetch can hand its outcome to every
/// waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected profile status: {0}")]
    UnexpectedStatus(u16),

    #[error("Profile decode error: {0}")]
    Decode(String),
}

impl From<ApiError> for SessionError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Status { status, .. } if status == StatusCode::UNAUTHORIZED => {
                SessionError::Unauthenticated
            }
            ApiError::Status { status, .. } => SessionError::UnexpectedStatus(status.as_u16()),
            ApiError::Decode(msg) | ApiError::InvalidResponse(msg) => SessionError::Decode(msg),
            ApiError::InvalidUrl(msg) | ApiError::Transport(msg) | ApiError::Validation(msg) => {
                SessionError::Transport(msg)
            }
        }
    }
}
