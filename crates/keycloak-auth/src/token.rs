//! Password and refresh-token grants against the Keycloak token endpoint
//!
//! Both grants POST a form-encoded body to
//! `{server_url}/realms/master/protocol/openid-connect/token` and parse the
//! same JSON response. They hold no state; callers decide what to do with a
//! failure.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{ADMIN_CLI_CLIENT_ID, TOKEN_PATH};
use crate::error::{Error, Result};

/// Response from the token endpoint for both grants.
///
/// Lifetimes are deltas in seconds from the response time. Keycloak reports
/// `refresh_expires_in` as `0` for offline tokens and omits it for some
/// grant configurations, so it is kept signed and optional.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Build the token endpoint URL for a server base URL.
///
/// A trailing slash on the base URL is ignored.
pub fn token_endpoint(server_url: &str) -> String {
    format!("{}{}", server_url.trim_end_matches('/'), TOKEN_PATH)
}

/// Obtain a fresh token pair with the admin username and password.
pub async fn fetch_by_password(
    client: &reqwest::Client,
    server_url: &str,
    username: &str,
    password: &str,
) -> Result<TokenResponse> {
    post_grant(
        client,
        server_url,
        "password",
        &[
            ("grant_type", "password"),
            ("client_id", ADMIN_CLI_CLIENT_ID),
            ("username", username),
            ("password", password),
        ],
    )
    .await
}

/// Exchange a refresh token for a new token pair.
pub async fn fetch_by_refresh_token(
    client: &reqwest::Client,
    server_url: &str,
    refresh: &str,
) -> Result<TokenResponse> {
    post_grant(
        client,
        server_url,
        "refresh_token",
        &[
            ("grant_type", "refresh_token"),
            ("client_id", ADMIN_CLI_CLIENT_ID),
            ("refresh_token", refresh),
        ],
    )
    .await
}

async fn post_grant(
    client: &reqwest::Client,
    server_url: &str,
    grant: &'static str,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let endpoint = token_endpoint(server_url);
    debug!(grant, endpoint = %endpoint, "requesting token");

    let response = client
        .post(&endpoint)
        .form(form)
        .send()
        .await
        .map_err(|e| Error::Http(format!("{grant} grant request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // Keycloak answers a bad password or a dead refresh token with
        // 400 invalid_grant; 401/403 cover disabled clients and users.
        if matches!(status.as_u16(), 400 | 401 | 403) {
            return Err(Error::InvalidCredentials(format!(
                "{grant} grant rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenEndpoint(format!(
            "{grant} grant returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("{grant} grant: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_body(access: &str) -> serde_json::Value {
        serde_json::json!({
            "access_token": access,
            "refresh_token": format!("rt_{access}"),
            "expires_in": 300,
            "refresh_expires_in": 1800,
            "token_type": "Bearer",
        })
    }

    #[test]
    fn token_response_deserializes_full_body() {
        let json = r#"{"access_token":"at","refresh_token":"rt","expires_in":60,"refresh_expires_in":1800,"token_type":"Bearer","scope":"profile email"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "at");
        assert_eq!(token.refresh_token.as_deref(), Some("rt"));
        assert_eq!(token.expires_in, 60);
        assert_eq!(token.refresh_expires_in, Some(1800));
        assert_eq!(token.token_type.as_deref(), Some("Bearer"));
    }

    #[test]
    fn token_response_tolerates_missing_optional_fields() {
        let json = r#"{"access_token":"at","expires_in":60}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(token.refresh_token.is_none());
        assert!(token.refresh_expires_in.is_none());
        assert!(token.token_type.is_none());
    }

    #[test]
    fn token_response_accepts_zero_refresh_lifetime() {
        let json = r#"{"access_token":"at","refresh_token":"rt","expires_in":60,"refresh_expires_in":0}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.refresh_expires_in, Some(0));
    }

    #[test]
    fn token_endpoint_appends_master_realm_path() {
        assert_eq!(
            token_endpoint("https://keycloak.example.com"),
            "https://keycloak.example.com/realms/master/protocol/openid-connect/token"
        );
        assert_eq!(
            token_endpoint("https://keycloak.example.com/"),
            "https://keycloak.example.com/realms/master/protocol/openid-connect/token"
        );
    }

    #[tokio::test]
    async fn password_grant_sends_form_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("client_id=admin-cli"))
            .and(body_string_contains("username=admin"))
            .and(body_string_contains("password=p%40ss+word"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at_pw")))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let token = fetch_by_password(&client, &server.uri(), "admin", "p@ss word")
            .await
            .unwrap();

        assert_eq!(token.access_token, "at_pw");
        assert_eq!(token.refresh_token.as_deref(), Some("rt_at_pw"));
        assert_eq!(token.expires_in, 300);
    }

    #[tokio::test]
    async fn refresh_grant_sends_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("client_id=admin-cli"))
            .and(body_string_contains("refresh_token=rt_old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at_refreshed")))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let token = fetch_by_refresh_token(&client, &server.uri(), "rt_old")
            .await
            .unwrap();

        assert_eq!(token.access_token, "at_refreshed");
    }

    #[tokio::test]
    async fn invalid_grant_maps_to_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid user credentials",
            })))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_by_password(&client, &server.uri(), "admin", "wrong")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidCredentials(_)), "got: {err:?}");
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn unauthorized_refresh_maps_to_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_by_refresh_token(&client, &server.uri(), "rt_revoked")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidCredentials(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn server_error_maps_to_token_endpoint_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_by_password(&client, &server.uri(), "admin", "pw")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TokenEndpoint(_)), "got: {err:?}");
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("maintenance"));
    }

    #[tokio::test]
    async fn malformed_body_maps_to_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_by_password(&client, &server.uri(), "admin", "pw")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidResponse(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn unreachable_server_maps_to_http_error() {
        let client = reqwest::Client::new();
        let err = fetch_by_password(&client, "http://127.0.0.1:1", "admin", "pw")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Http(_)), "got: {err:?}");
    }
}
