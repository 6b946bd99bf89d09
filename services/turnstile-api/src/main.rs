//! Turnstile API
//!
//! Request-authentication service guarding a stateless API with signed,
//! single-use requests and bearer credentials.
//!
//! ## REST Endpoints
//!
//! - `GET /api/v1/auth/nonce?timestamp=…` - Issue a single-use nonce
//! - `POST /api/v1/auth/login` - Exchange signed account credentials for tokens
//! - `POST /api/v1/auth/refresh` - Exchange a signed refresh token for tokens
//! - `GET /api/v1/me` - Signed + bearer; returns the caller's identity
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod handlers;
mod router;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use turnstile_auth_core::{AuthService, RequestGuard, StaticCredentials, SystemClock};
use turnstile_db::PgNonceRepository;

use crate::config::Config;
use crate::router::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("turnstile_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Turnstile API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        issuer = %config.auth.issuer,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool and nonce table
    let pool = turnstile_db::create_pool(&config.database_url).await?;
    turnstile_db::ensure_schema(&pool).await?;
    tracing::info!("Database pool created");

    // Build the auth stack
    let clock = SystemClock::shared();
    let nonces = Arc::new(PgNonceRepository::new(pool));
    let guard = RequestGuard::new(&config.auth, clock, nonces)?;
    let credentials = Arc::new(StaticCredentials::new(
        config.account.username.clone(),
        config.account.password.clone(),
        config.account.role.clone(),
    ));
    let auth = AuthService::new(guard, credentials);

    // Create application state
    let state = AppState::new(auth, config.clone());

    // Periodic expired-nonce sweep
    let sweeper = state.guard().nonces().spawn_sweeper(config.sweep_interval);

    // Build HTTP router
    let app = build_router(state, metrics_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let result = run_http_server(app, addr).await;

    sweeper.abort();
    tracing::info!("Shutdown complete");
    result
}

async fn run_http_server(app: axum::Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!(
        "turnstile_requests_admitted_total",
        "Requests that passed timestamp, nonce and signature checks"
    );
    metrics::describe_counter!(
        "turnstile_requests_rejected_total",
        "Requests rejected by the auth layers, by error code"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
