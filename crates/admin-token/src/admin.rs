//! Authorized calls to the Keycloak admin API
//!
//! Collaborators that provision realms, roles and users build a
//! `reqwest::RequestBuilder` and hand it to `send_authorized`. The helper
//! attaches the cached bearer token and, when Keycloak answers 401, drops
//! the cached tokens so the next call re-authenticates from scratch.
//!
//! Exactly one attempt is made per call. Retry cadence belongs to the caller.

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::manager::{AdminToken, AdminTokenManager};

/// Send `request` with the current admin token.
///
/// - No token available: `Error::Unavailable`, nothing is sent
/// - Transport failure: `Error::Request`
/// - 401 from the admin API: tokens invalidated, `Error::Rejected`
///
/// Every other status is returned to the caller as-is.
pub async fn send_authorized(
    manager: &AdminTokenManager,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response> {
    let token = match manager.access_token().await {
        AdminToken::Available(token) => token,
        AdminToken::Unavailable(e) => {
            debug!(error = %e, "skipping admin call, no token available");
            return Err(e);
        }
    };

    let response = request
        .bearer_auth(&token)
        .send()
        .await
        .map_err(|e| Error::Request(e.to_string()))?;

    if response.status() == StatusCode::UNAUTHORIZED {
        warn!(url = %response.url(), "admin API rejected token, invalidating cached tokens");
        manager.invalidate().await;
        return Err(Error::Rejected(format!(
            "{} returned {}",
            response.url(),
            response.status()
        )));
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::manager::testing::{ScriptedSource, rejected, token};
    use crate::state::TokenPhase;

    #[tokio::test]
    async fn attaches_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/studyconnect"))
            .and(header("authorization", "Bearer at_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "realm": "studyconnect",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = Arc::new(ScriptedSource::new());
        source.push_password(Ok(token("at_1", 300, Some(1800))));
        let manager = AdminTokenManager::new(source.clone());
        let client = reqwest::Client::new();

        let response = send_authorized(
            &manager,
            client.get(format!("{}/admin/realms/studyconnect", server.uri())),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_401_errors_are_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let source = Arc::new(ScriptedSource::new());
        source.push_password(Ok(token("at_1", 300, Some(1800))));
        let manager = AdminTokenManager::new(source.clone());
        let client = reqwest::Client::new();

        let response = send_authorized(&manager, client.post(format!("{}/admin/realms", server.uri())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(manager.status().await.state, TokenPhase::Valid);
    }

    #[tokio::test]
    async fn unauthorized_invalidates_cached_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let source = Arc::new(ScriptedSource::new());
        source.push_password(Ok(token("at_1", 300, Some(1800))));
        source.push_password(Ok(token("at_2", 300, Some(1800))));
        let manager = AdminTokenManager::new(source.clone());
        let client = reqwest::Client::new();

        let err = send_authorized(&manager, client.get(format!("{}/admin/realms", server.uri())))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Rejected(_)), "got: {err:?}");
        assert_eq!(manager.status().await.state, TokenPhase::Empty);

        assert_eq!(manager.access_token().await.token(), Some("at_2"));
        assert_eq!(source.calls(), vec!["password", "password"]);
    }

    #[tokio::test]
    async fn unavailable_token_skips_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let source = Arc::new(ScriptedSource::new());
        source.push_password(Err(rejected()));
        let manager = AdminTokenManager::new(source.clone());
        let client = reqwest::Client::new();

        let err = send_authorized(&manager, client.get(format!("{}/admin/realms", server.uri())))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unavailable(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn transport_failure_is_a_request_error() {
        let source = Arc::new(ScriptedSource::new());
        source.push_password(Ok(token("at_1", 300, Some(1800))));
        let manager = AdminTokenManager::new(source.clone());
        let client = reqwest::Client::new();

        let err = send_authorized(&manager, client.get("http://127.0.0.1:1/admin/realms"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Request(_)), "got: {err:?}");
        assert_eq!(
            manager.status().await.state,
            TokenPhase::Valid,
            "transport failures do not invalidate"
        );
    }
}
