//! Single-flight admin token cache
//!
//! `AdminTokenManager` owns the only `TokenState` behind a tokio `Mutex`.
//! Every read, refresh and invalidation runs with that lock held, including
//! the token endpoint round trip. A caller that queues behind an in-flight
//! grant re-checks the state once it gets the lock and finds the fresh token
//! instead of issuing a grant of its own.
//!
//! Transitions on `access_token()`:
//! - Empty → password grant
//! - Valid → cached token, no network
//! - AccessExpired → refresh grant, falling back to a password grant on failure
//! - RefreshExpired → password grant
//!
//! A failed final password grant leaves the state as it was and reports the
//! token as unavailable; nothing is retried until the next call or tick.

use std::fmt;
use std::sync::Arc;

use common::Secret;
use keycloak_auth::{TokenResponse, TokenSource};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::metrics::{Grant, record_grant, record_invalidation, record_unavailable};
use crate::state::{TokenPhase, TokenState};

/// Result of asking the cache for a token.
pub enum AdminToken {
    Available(String),
    Unavailable(Error),
}

impl AdminToken {
    pub fn is_available(&self) -> bool {
        matches!(self, AdminToken::Available(_))
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            AdminToken::Available(token) => Some(token),
            AdminToken::Unavailable(_) => None,
        }
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            AdminToken::Available(token) => Some(token),
            AdminToken::Unavailable(_) => None,
        }
    }
}

impl fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminToken::Available(_) => f.write_str("Available([REDACTED])"),
            AdminToken::Unavailable(e) => f.debug_tuple("Unavailable").field(e).finish(),
        }
    }
}

/// Snapshot of the cache for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    pub state: TokenPhase,
    /// Literal seconds left on the access token, if one is cached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_secs: Option<u64>,
}

/// What a scheduler tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing cached yet, or the token was invalidated
    Idle,
    /// Access token still outside the buffer
    Fresh,
    Refreshed,
    Failed,
}

/// Process-wide cache for the Keycloak admin token.
///
/// Create one at startup and share it via `Arc`.
pub struct AdminTokenManager {
    source: Arc<dyn TokenSource>,
    state: Mutex<TokenState>,
}

impl AdminTokenManager {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            state: Mutex::new(TokenState::default()),
        }
    }

    /// Startup acquisition.
    ///
    /// With blank credentials this only logs a warning; the cache stays empty
    /// and callers keep attempting password grants on demand. A failed grant
    /// is logged and likewise leaves the cache empty. Returns whether a token
    /// was obtained.
    pub async fn initialize(&self) -> bool {
        if !self.source.is_configured() {
            warn!(
                "Keycloak admin credentials not configured, admin token cache will stay empty; \
                 set KEYCLOAK_ADMIN and KEYCLOAK_ADMIN_PASSWORD"
            );
            return false;
        }

        let mut state = self.state.lock().await;
        match self.acquire(&mut state).await {
            Ok(_) => {
                info!("Keycloak admin token initialized");
                true
            }
            Err(e) => {
                warn!(error = %e, "initial admin token fetch failed, will retry on first use");
                false
            }
        }
    }

    /// Return a usable admin access token, fetching or refreshing as needed.
    ///
    /// Never fails loudly: any grant failure comes back as
    /// `AdminToken::Unavailable` and the caller should skip the admin call.
    pub async fn access_token(&self) -> AdminToken {
        let mut state = self.state.lock().await;

        if !state.access_expired(Instant::now()) {
            if let Some(token) = state.access_token() {
                return AdminToken::Available(token.to_owned());
            }
        }

        let result = if state.is_empty() {
            self.acquire(&mut state).await
        } else {
            self.renew(&mut state).await
        };

        match result {
            Ok(token) => AdminToken::Available(token),
            Err(e) => {
                record_unavailable();
                AdminToken::Unavailable(Error::from(e))
            }
        }
    }

    /// Drop the cached tokens so the next `access_token()` does a full
    /// password grant. Idempotent.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.clear();
        record_invalidation();
        info!("Keycloak admin tokens invalidated");
    }

    /// Scheduler tick: refresh ahead of need if the access token is inside
    /// its buffer. Does nothing while the cache is empty.
    pub async fn refresh_if_due(&self) -> TickOutcome {
        let mut state = self.state.lock().await;

        if state.is_empty() {
            return TickOutcome::Idle;
        }
        if !state.access_expired(Instant::now()) {
            return TickOutcome::Fresh;
        }

        debug!("scheduled admin token refresh triggered");
        match self.renew(&mut state).await {
            Ok(_) => TickOutcome::Refreshed,
            Err(e) => {
                error!(error = %e, "scheduled admin token refresh failed");
                TickOutcome::Failed
            }
        }
    }

    /// Current phase and remaining lifetime. Never touches the network.
    pub async fn status(&self) -> TokenStatus {
        let state = self.state.lock().await;
        let now = Instant::now();
        TokenStatus {
            state: state.phase(now),
            expires_in_secs: state.remaining_access(now).map(|d| d.as_secs()),
        }
    }

    /// Password grant. Caller holds the lock.
    async fn acquire(&self, state: &mut TokenState) -> keycloak_auth::Result<String> {
        info!("fetching new Keycloak admin token");
        match Self::store(state, self.source.password_grant().await) {
            Ok(token) => {
                record_grant(Grant::Password, true);
                info!("fetched new Keycloak admin token");
                Ok(token)
            }
            Err(e) => {
                record_grant(Grant::Password, false);
                error!(error = %e, "failed to fetch Keycloak admin token");
                Err(e)
            }
        }
    }

    /// Refresh grant with password-grant fallback. Caller holds the lock.
    async fn renew(&self, state: &mut TokenState) -> keycloak_auth::Result<String> {
        let refresh: Secret<String> = match state.refresh_token() {
            Some(refresh) if !state.refresh_expired(Instant::now()) => refresh.clone(),
            _ => {
                debug!("refresh token expired or missing, fetching new token");
                return self.acquire(state).await;
            }
        };

        debug!("refreshing Keycloak admin token");
        match Self::store(state, self.source.refresh_grant(refresh.expose()).await) {
            Ok(token) => {
                record_grant(Grant::Refresh, true);
                info!("refreshed Keycloak admin token");
                Ok(token)
            }
            Err(e) => {
                record_grant(Grant::Refresh, false);
                warn!(error = %e, "failed to refresh admin token, falling back to password grant");
                self.acquire(state).await
            }
        }
    }

    /// Apply a grant result to the state, returning the new access token.
    ///
    /// A response the state cannot hold counts as a failed grant.
    fn store(
        state: &mut TokenState,
        result: keycloak_auth::Result<TokenResponse>,
    ) -> keycloak_auth::Result<String> {
        let response = result?;
        let token = response.access_token.clone();
        state.apply(response, Instant::now())?;
        Ok(token)
    }

    #[cfg(test)]
    pub(crate) async fn with_state<R>(&self, f: impl FnOnce(&mut TokenState) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state)
    }
}
