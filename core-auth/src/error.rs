use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization denied by provider: {0}")]
    AuthorizationDenied(String),

    #[error("OAuth state mismatch: expected '{expected}', got '{actual}'")]
    StateMismatch { expected: String, actual: String },

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("No PKCE verifier stored for this authorization attempt")]
    MissingVerifier,

    #[error("Persistent storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid authorization URL: {0}")]
    InvalidAuthUrl(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
