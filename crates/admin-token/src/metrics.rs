//! Token cache counters
//!
//! - `admin_token_grants_total` (counter): labels `grant`, `outcome`
//! - `admin_token_invalidations_total` (counter)
//! - `admin_token_unavailable_total` (counter)
//!
//! Without an installed recorder these are no-ops.

/// Which grant hit the token endpoint.
#[derive(Debug, Clone, Copy)]
pub enum Grant {
    Password,
    Refresh,
}

impl Grant {
    pub fn label(&self) -> &'static str {
        match self {
            Grant::Password => "password",
            Grant::Refresh => "refresh",
        }
    }
}

pub fn record_grant(grant: Grant, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("admin_token_grants_total", "grant" => grant.label(), "outcome" => outcome)
        .increment(1);
}

pub fn record_invalidation() {
    metrics::counter!("admin_token_invalidations_total").increment(1);
}

/// A caller was told no token is available.
pub fn record_unavailable() {
    metrics::counter!("admin_token_unavailable_total").increment(1);
}
