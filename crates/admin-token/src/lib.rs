//! Keycloak admin token cache
//!
//! Keeps one always-current service-account token for the Keycloak admin
//! API. Callers ask `AdminTokenManager::access_token()` for a token and get
//! either `Available` or `Unavailable`; they never see a panic or a raw
//! transport error.
//!
//! Token lifecycle:
//! 1. Startup calls `initialize()` → one password grant if credentials are set
//! 2. Callers get the cached token while it is outside the 60s buffer
//! 3. Inside the buffer, the refresh grant renews it, falling back to a password grant
//! 4. Background task refreshes ahead of need every 30s
//! 5. A 401 from the admin API → `invalidate()` → next call re-authenticates

pub mod admin;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod refresh;
pub mod state;

pub use admin::send_authorized;
pub use error::{Error, Result};
pub use manager::{AdminToken, AdminTokenManager, TickOutcome, TokenStatus};
pub use refresh::{DEFAULT_REFRESH_INTERVAL, spawn_refresh_task};
pub use state::{DEFAULT_REFRESH_LIFETIME, REFRESH_BUFFER, TokenPhase, TokenState};
