//! Cached admin token pair and its expiry bookkeeping
//!
//! `TokenState` is a plain record. It does no locking of its own; the
//! manager owns the only instance behind its mutex and never reads or writes
//! it outside that lock.
//!
//! Phases:
//! - Empty: nothing fetched yet, or invalidated
//! - Valid: access token present and outside the refresh buffer
//! - AccessExpired: access token inside the buffer, refresh token still usable
//! - RefreshExpired: both tokens inside the buffer (or no refresh token)

use common::Secret;
use keycloak_auth::{Error, TokenResponse};
use serde::Serialize;
use tokio::time::{Duration, Instant};

/// Tokens count as expired this long before their literal expiry.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(60);

/// Refresh lifetime assumed when the token endpoint omits it or reports a
/// non-positive value.
pub const DEFAULT_REFRESH_LIFETIME: Duration = Duration::from_secs(1800);

/// Conceptual lifecycle phase of the cached tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPhase {
    Empty,
    Valid,
    AccessExpired,
    RefreshExpired,
}

impl TokenPhase {
    /// Phase label for health/logging.
    pub fn label(&self) -> &'static str {
        match self {
            TokenPhase::Empty => "empty",
            TokenPhase::Valid => "valid",
            TokenPhase::AccessExpired => "access_expired",
            TokenPhase::RefreshExpired => "refresh_expired",
        }
    }
}

#[derive(Debug, Default)]
pub struct TokenState {
    access_token: Option<Secret<String>>,
    refresh_token: Option<Secret<String>>,
    access_expiry: Option<Instant>,
    refresh_expiry: Option<Instant>,
}

impl TokenState {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_ref().map(|t| t.expose().as_str())
    }

    pub fn refresh_token(&self) -> Option<&Secret<String>> {
        self.refresh_token.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn access_expiry(&self) -> Option<Instant> {
        self.access_expiry
    }

    #[cfg(test)]
    pub(crate) fn refresh_expiry(&self) -> Option<Instant> {
        self.refresh_expiry
    }

    /// Whether the access token must be replaced before use at `now`.
    ///
    /// An absent token is always expired, whatever `access_expiry` says.
    pub fn access_expired(&self, now: Instant) -> bool {
        match (&self.access_token, self.access_expiry) {
            (Some(_), Some(expiry)) => now + REFRESH_BUFFER > expiry,
            _ => true,
        }
    }

    /// Whether the refresh token is unusable at `now`.
    pub fn refresh_expired(&self, now: Instant) -> bool {
        match (&self.refresh_token, self.refresh_expiry) {
            (Some(_), Some(expiry)) => now + REFRESH_BUFFER > expiry,
            _ => true,
        }
    }

    pub fn phase(&self, now: Instant) -> TokenPhase {
        if self.is_empty() {
            TokenPhase::Empty
        } else if !self.access_expired(now) {
            TokenPhase::Valid
        } else if !self.refresh_expired(now) {
            TokenPhase::AccessExpired
        } else {
            TokenPhase::RefreshExpired
        }
    }

    /// Literal time left on the access token, ignoring the buffer.
    pub fn remaining_access(&self, now: Instant) -> Option<Duration> {
        self.access_token
            .as_ref()
            .and(self.access_expiry)
            .map(|expiry| expiry.saturating_duration_since(now))
    }

    /// Replace the cached pair with a token endpoint response received at `now`.
    ///
    /// A lifetime too large to represent as an instant is an invalid response;
    /// the state is left untouched in that case.
    pub fn apply(&mut self, response: TokenResponse, now: Instant) -> keycloak_auth::Result<()> {
        let refresh_lifetime = match response.refresh_expires_in {
            Some(secs) if secs > 0 => Duration::from_secs(secs.unsigned_abs()),
            _ => DEFAULT_REFRESH_LIFETIME,
        };

        let access_expiry = now
            .checked_add(Duration::from_secs(response.expires_in))
            .ok_or_else(|| {
                Error::InvalidResponse(format!("expires_in out of range: {}", response.expires_in))
            })?;
        let refresh_expiry = now.checked_add(refresh_lifetime).ok_or_else(|| {
            Error::InvalidResponse(format!(
                "refresh_expires_in out of range: {}",
                refresh_lifetime.as_secs()
            ))
        })?;

        self.access_token = Some(Secret::new(response.access_token));
        self.refresh_token = response.refresh_token.map(Secret::new);
        self.access_expiry = Some(access_expiry);
        self.refresh_expiry = Some(refresh_expiry);
        Ok(())
    }

    /// Forget everything; the next use must do a full acquisition.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
