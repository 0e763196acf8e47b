//! Token source abstraction
//!
//! `TokenSource` is the seam between the token cache and the network. The
//! cache only ever asks for "a password grant" or "a refresh grant for this
//! token"; `KeycloakGrants` answers those against a real Keycloak server,
//! tests answer them from a script.
//!
//! Uses `Pin<Box<dyn Future>>` return types so the cache can hold an
//! `Arc<dyn TokenSource>`.

use std::future::Future;
use std::pin::Pin;

use common::Secret;

use crate::error::Result;
use crate::token::{TokenResponse, fetch_by_password, fetch_by_refresh_token};

/// Boxed future returned by `TokenSource` grants.
pub type GrantFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenResponse>> + Send + 'a>>;

/// Issues admin tokens on behalf of the token cache.
pub trait TokenSource: Send + Sync {
    /// Full acquisition with the configured admin credentials.
    fn password_grant(&self) -> GrantFuture<'_>;

    /// Exchange `refresh` for a new token pair.
    fn refresh_grant<'a>(&'a self, refresh: &'a str) -> GrantFuture<'a>;

    /// Whether admin credentials are present. A source that reports `false`
    /// still attempts grants when asked; this only drives startup behavior.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Keycloak admin credentials plus the HTTP client used to present them.
///
/// The client is expected to carry the request timeout; grants add none of
/// their own.
#[derive(Clone)]
pub struct KeycloakGrants {
    client: reqwest::Client,
    server_url: String,
    username: String,
    password: Secret<String>,
}

impl KeycloakGrants {
    pub fn new(
        client: reqwest::Client,
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: Secret<String>,
    ) -> Self {
        Self {
            client,
            server_url: server_url.into(),
            username: username.into(),
            password,
        }
    }
}

impl std::fmt::Debug for KeycloakGrants {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakGrants")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &self.password)
            .finish()
    }
}

impl TokenSource for KeycloakGrants {
    fn password_grant(&self) -> GrantFuture<'_> {
        Box::pin(fetch_by_password(
            &self.client,
            &self.server_url,
            &self.username,
            self.password.expose(),
        ))
    }

    fn refresh_grant<'a>(&'a self, refresh: &'a str) -> GrantFuture<'a> {
        Box::pin(fetch_by_refresh_token(&self.client, &self.server_url, refresh))
    }

    fn is_configured(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_blank()
    }
}
