//! Keycloak admin token acquisition
//!
//! Speaks the two OAuth grants the admin token cache needs against the
//! `master` realm token endpoint. This crate holds no token state; it can
//! be tested and used independently of the cache.
//!
//! Grant flow:
//! 1. Startup or first use calls `fetch_by_password()` with the admin credentials
//! 2. While the refresh token is alive, `fetch_by_refresh_token()` renews the pair
//! 3. When a refresh fails, the cache falls back to `fetch_by_password()`

pub mod constants;
pub mod error;
pub mod source;
pub mod token;

pub use constants::*;
pub use error::{Error, Result};
pub use source::{GrantFuture, KeycloakGrants, TokenSource};
pub use token::{TokenResponse, fetch_by_password, fetch_by_refresh_token, token_endpoint};
