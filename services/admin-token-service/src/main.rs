//! Keycloak admin token service
//!
//! Single-binary Rust service that:
//! 1. Loads Keycloak admin credentials from config, env and secret files
//! 2. Acquires an admin token at startup and keeps it fresh in the background
//! 3. Reports token health on `/health` and token counters on `/metrics`

mod config;
mod metrics;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use admin_token::{AdminTokenManager, TokenPhase, spawn_refresh_task};
use common::Secret;
use keycloak_auth::{KeycloakGrants, TokenSource};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::{Config, KeycloakConfig};

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    tokens: Arc<AdminTokenManager>,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Build the Keycloak grants from config.
///
/// The HTTP client carries the configured timeout for every grant.
fn build_grants(keycloak: &KeycloakConfig) -> Result<KeycloakGrants> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(keycloak.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let password = keycloak
        .admin_password
        .clone()
        .unwrap_or_else(|| Secret::from(""));

    Ok(KeycloakGrants::new(
        client,
        keycloak.server_url.clone(),
        keycloak.admin_username.clone(),
        password,
    ))
}

fn build_manager(keycloak: &KeycloakConfig) -> Result<Arc<AdminTokenManager>> {
    let grants = build_grants(keycloak)?;
    info!(
        server_url = %keycloak.server_url,
        credentials_configured = grants.is_configured(),
        "Keycloak grants ready"
    );
    Ok(Arc::new(AdminTokenManager::new(Arc::new(grants))))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting keycloak-admin-token");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        server_url = %config.keycloak.server_url,
        admin_username = %config.keycloak.admin_username,
        refresh_interval_secs = config.refresh.interval_secs,
        "configuration loaded"
    );

    let tokens = build_manager(&config.keycloak)?;

    // Startup failure is not fatal: callers fall back to on-demand grants
    tokens.initialize().await;

    let refresh_handle = spawn_refresh_task(
        tokens.clone(),
        Duration::from_secs(config.refresh.interval_secs),
    );

    let app = build_router(AppState {
        tokens,
        started_at: Instant::now(),
        prometheus: prometheus_handle,
    });

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    refresh_handle.abort();

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: token phase, remaining lifetime, uptime.
/// Returns 200 while a valid token is cached, 503 otherwise.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.started_at.elapsed().as_secs();
    let token = state.tokens.status().await;

    let (status_code, status) = match token.state {
        TokenPhase::Valid => (axum::http::StatusCode::OK, "healthy"),
        _ => (axum::http::StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    };

    let body = serde_json::json!({
        "status": status,
        "token": token,
        "uptime_seconds": uptime,
    });

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint, text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
