//! Authentication handlers (nonce, login, refresh, me)

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use turnstile_auth_core::{LoginRequest, RefreshRequest};
use turnstile_axum::{RequireAuth, TIMESTAMP_HEADER};
use turnstile_db::NonceRepository;
use turnstile_types::TokenPair;

use crate::error::ApiResult;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NonceQuery {
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NonceResponse {
    pub nonce: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub subject: String,
    pub contact: String,
    pub role: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/auth/nonce - Issue a nonce to a client with a fresh clock
pub async fn issue_nonce<R: NonceRepository + 'static>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    query: Result<Query<NonceQuery>, QueryRejection>,
) -> ApiResult<Json<NonceResponse>> {
    let Query(query) = query?;
    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or(query.timestamp);

    let nonce = state.auth.issue_nonce(timestamp.as_deref()).await?;
    Ok(Json(NonceResponse { nonce }))
}

/// POST /api/v1/auth/login - Exchange signed account credentials for tokens
pub async fn login<R: NonceRepository + 'static>(
    State(state): State<AppState<R>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<TokenPair>> {
    let Json(request) = payload?;
    let pair = state.auth.login(&request).await?;
    Ok(Json(pair))
}

/// POST /api/v1/auth/refresh - Exchange a signed refresh token for new tokens
pub async fn refresh<R: NonceRepository + 'static>(
    State(state): State<AppState<R>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<TokenPair>> {
    let Json(request) = payload?;
    let pair = state.auth.refresh(&request).await?;
    tracing::debug!("Token pair refreshed");
    Ok(Json(pair))
}

/// GET /api/v1/me - Identity behind the access credential
pub async fn me(auth: RequireAuth) -> Json<MeResponse> {
    let identity = auth.0.identity;
    Json(MeResponse {
        subject: identity.subject,
        contact: identity.contact,
        role: identity.role,
    })
}
