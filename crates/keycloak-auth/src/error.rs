//! Error types for token endpoint operations

/// Errors from a password or refresh-token grant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("token endpoint error: {0}")]
    TokenEndpoint(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

/// Result alias for grant operations.
pub type Result<T> = std::result::Result<T, Error>;
