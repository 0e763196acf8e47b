//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The admin password is loaded from KEYCLOAK_ADMIN_PASSWORD or
//! admin_password_file, never from the TOML directly. Missing credentials are
//! not a config error: the token cache starts empty and logs a warning.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub keycloak: KeycloakConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    pub server: ServerConfig,
}

/// Keycloak connection and admin credentials
#[derive(Debug, Deserialize)]
pub struct KeycloakConfig {
    /// Base URL, e.g. `http://keycloak:8080` (KEYCLOAK_AUTH_SERVER_URL overrides)
    #[serde(default)]
    pub server_url: String,
    /// KEYCLOAK_ADMIN overrides
    #[serde(default)]
    pub admin_username: String,
    #[serde(skip)]
    pub admin_password: Option<Secret<String>>,
    /// Path to a file containing the admin password (alternative to KEYCLOAK_ADMIN_PASSWORD)
    #[serde(default)]
    pub admin_password_file: Option<PathBuf>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Background refresh settings
#[derive(Debug, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_refresh_interval(),
        }
    }
}

/// Health/metrics listener
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

fn default_timeout() -> u64 {
    30
}

fn default_refresh_interval() -> u64 {
    admin_token::DEFAULT_REFRESH_INTERVAL.as_secs()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Password resolution order:
    /// 1. KEYCLOAK_ADMIN_PASSWORD env var
    /// 2. admin_password_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        let keycloak = &mut config.keycloak;

        if let Ok(url) = std::env::var("KEYCLOAK_AUTH_SERVER_URL") {
            keycloak.server_url = url;
        }
        if let Ok(username) = std::env::var("KEYCLOAK_ADMIN") {
            keycloak.admin_username = username;
        }

        keycloak.server_url = trim_value("server_url", &keycloak.server_url)
            .trim_end_matches('/')
            .to_owned();
        keycloak.admin_username = trim_value("admin_username", &keycloak.admin_username).to_owned();

        if keycloak.server_url.is_empty() {
            return Err(common::Error::Config(
                "server_url must be set in [keycloak] or via KEYCLOAK_AUTH_SERVER_URL".into(),
            ));
        }

        if !keycloak.server_url.starts_with("http://")
            && !keycloak.server_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "server_url must start with http:// or https://, got: {}",
                keycloak.server_url
            )));
        }

        if keycloak.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.refresh.interval_secs == 0 {
            return Err(common::Error::Config(
                "refresh interval_secs must be greater than 0".into(),
            ));
        }

        // Resolve password: env var takes precedence over file
        let password = if let Ok(password) = std::env::var("KEYCLOAK_ADMIN_PASSWORD") {
            Some(password)
        } else if let Some(ref password_file) = keycloak.admin_password_file {
            let password = std::fs::read_to_string(password_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read admin_password_file {}: {e}",
                    password_file.display()
                ))
            })?;
            // Files conventionally end with a newline; that is not worth a warning
            Some(password.trim_end_matches(['\r', '\n']).to_owned())
        } else {
            None
        };

        keycloak.admin_password = password
            .map(|p| trim_value("admin_password", &p).to_owned())
            .filter(|p| !p.is_empty())
            .map(Secret::new);

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("keycloak-admin-token.toml")
    }
}

/// Trim surrounding whitespace, warning when there was any.
///
/// The value itself is never logged; it may be a credential.
fn trim_value<'a>(key: &str, value: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        warn!(key, "config value has surrounding whitespace; trimming");
    }
    trimmed
}
