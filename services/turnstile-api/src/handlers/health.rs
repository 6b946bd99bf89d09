//! Health check handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::time::Instant;
use turnstile_db::NonceRepository;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub checks: ReadyChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadyChecks {
    pub nonce_store: CheckResult,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    pub latency_ms: u64,
}

/// GET /health - Liveness probe (fast, no dependencies)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "turnstile-api",
    })
}

/// GET /ready - Readiness probe (checks the nonce store)
pub async fn ready<R: NonceRepository + 'static>(
    State(state): State<AppState<R>>,
) -> Result<Json<ReadyResponse>, StatusCode> {
    let start = Instant::now();
    let result = state.guard().nonces().check_store().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => Ok(Json(ReadyResponse {
            status: "ready",
            service: "turnstile-api",
            checks: ReadyChecks {
                nonce_store: CheckResult {
                    status: "ok",
                    latency_ms,
                },
            },
        })),
        Err(e) => {
            tracing::warn!(error = %e, latency_ms, "Readiness check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
