//! Backend client errors.

use thiserror::Error;

/// Errors returned by [`ApiClient`](super::ApiClient) calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered 401; the stored token has been discarded.
    #[error("unauthorized: session expired")]
    Unauthorized,

    /// Any other non-success status.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The category is still referenced and cannot be deleted.
    #[error("{0}")]
    InUse(String),

    #[error("request failed")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body")]
    Decode(#[from] serde_json::Error),

    #[error("invalid endpoint URL")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the error came from the backend rejecting credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
