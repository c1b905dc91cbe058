use reqwest::StatusCode;
use thiserror::Error;

/// Maximum bytes of a response body kept in an error message
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Failure talking to the ERP backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401: the bearer token was rejected.
    #[error("Authentication expired, please log in again")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 400: the backend refused the payload.
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend error (HTTP {status}): {body}")]
    Backend { status: u16, body: String },

    #[error("Unexpected HTTP {status}: {body}")]
    Unexpected { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... ({} bytes)", &body[..end], body.len())
    }

    /// Classify a non-success response.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = Self::truncate_body(body);
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden(body),
            StatusCode::BAD_REQUEST => ApiError::Rejected(body),
            StatusCode::NOT_FOUND => ApiError::NotFound(body),
            s if s.is_server_error() => ApiError::Backend {
                status: s.as_u16(),
                body,
            },
            s => ApiError::Unexpected {
                status: s.as_u16(),
                body,
            },
        }
    }

    /// Whether the session behind the request is no longer usable and the
    /// client should be forced back to the login view.
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
