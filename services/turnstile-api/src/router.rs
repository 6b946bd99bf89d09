//! Route table and middleware stack

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use turnstile_axum::{BearerAuthLayer, ExemptPaths, SignedRequestLayer};
use turnstile_db::NonceRepository;

use crate::handlers::{self, health, ready};
use crate::state::AppState;

/// Bootstrap routes inside `/api/v1`; they check their own body fields
pub const BOOTSTRAP_PATHS: [&str; 3] = ["/auth/nonce", "/auth/login", "/auth/refresh"];

pub fn build_router<R: NonceRepository + 'static>(
    state: AppState<R>,
    metrics_handle: Option<PrometheusHandle>,
) -> Router {
    let request_timeout = state.request_timeout();
    let guard = state.guard().clone();
    let exempt = ExemptPaths::new(BOOTSTRAP_PATHS);

    // API v1 routes. Layers added last run first: signature, then bearer.
    let api_v1 = Router::new()
        .route("/auth/nonce", get(handlers::issue_nonce::<R>))
        .route("/auth/login", post(handlers::login::<R>))
        .route("/auth/refresh", post(handlers::refresh::<R>))
        .route("/me", get(handlers::me))
        .layer(BearerAuthLayer::new(guard.clone()).exempt(exempt.clone()))
        .layer(SignedRequestLayer::new(guard).exempt(exempt));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready::<R>));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        // Request ID propagation (outermost)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Tracing with request details
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

    Router::new()
        .nest("/api/v1", api_v1)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}
