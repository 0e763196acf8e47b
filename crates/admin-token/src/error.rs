//! Error types for admin token operations

/// Errors surfaced by the token cache and the admin-call helper.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("admin token unavailable: {0}")]
    Unavailable(#[from] keycloak_auth::Error),

    #[error("admin request failed: {0}")]
    Request(String),

    #[error("admin token rejected: {0}")]
    Rejected(String),
}

/// Result alias for admin token operations.
pub type Result<T> = std::result::Result<T, Error>;
