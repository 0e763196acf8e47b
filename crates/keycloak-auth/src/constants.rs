//! Keycloak admin OAuth constants
//!
//! The admin API is authorized with tokens issued by the `master` realm to
//! Keycloak's built-in public `admin-cli` client. These values are not
//! secrets; the admin password and the issued tokens are.

/// Keycloak's built-in public client for administrative access
pub const ADMIN_CLI_CLIENT_ID: &str = "admin-cli";

/// Token endpoint path, relative to the server base URL
pub const TOKEN_PATH: &str = "/realms/master/protocol/openid-connect/token";
