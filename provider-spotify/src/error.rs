use thiserror::Error;

/// Typed outcomes of Web API calls.
///
/// Status-derived variants mirror the API's error contract one-to-one; the
/// remaining variants cover the client's own failure modes (missing
/// session, transport, malformed payloads).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authenticated. Please connect first.")]
    NotAuthenticated,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: the session expired. Please reconnect.")]
    Unauthorized,

    #[error("Forbidden: you do not have permission to access this resource.")]
    Forbidden,

    #[error("Not found: the requested resource was not found.")]
    NotFound,

    #[error("Rate limited: too many requests. Please try again later.")]
    RateLimited,

    #[error("Server error: the streaming API is experiencing issues.")]
    ServerError,

    #[error("API error: {status} {status_text}")]
    UnexpectedStatus { status: u16, status_text: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;
