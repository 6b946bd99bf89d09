//! HTTP-level tests for the signed request and bearer layers

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use turnstile_auth_core::{AuthConfig, Clock, FixedClock, Params, RequestGuard, SignedRequest};
use turnstile_axum::{BearerAuthLayer, ExemptPaths, MaybeAuth, RequireAuth, SignedRequestLayer};
use turnstile_db::MemoryNonceRepository;

const SECRET: &str = "layer-secret-0123456789abcdef01234";

struct TestApp {
    clock: Arc<FixedClock>,
    guard: RequestGuard<MemoryNonceRepository>,
    router: Router,
}

async fn me(auth: RequireAuth) -> Json<Value> {
    Json(json!({ "subject": auth.identity.subject, "role": auth.identity.role }))
}

async fn public(auth: MaybeAuth) -> &'static str {
    if auth.is_some() {
        "member"
    } else {
        "guest"
    }
}

fn app() -> TestApp {
    let clock = Arc::new(FixedClock::starting_now());
    let guard = RequestGuard::new(
        &AuthConfig::new(SECRET),
        clock.clone(),
        Arc::new(MemoryNonceRepository::new()),
    )
    .unwrap();

    let exempt = ExemptPaths::new(["/public"]);
    let router = Router::new()
        .route("/me", get(me))
        .route("/public", get(public))
        .layer(BearerAuthLayer::new(guard.clone()).exempt(exempt.clone()))
        .layer(SignedRequestLayer::new(guard.clone()).exempt(exempt));

    TestApp { clock, guard, router }
}

impl TestApp {
    async fn signed_query(&self, extra: &[(&str, &str)]) -> String {
        let nonce = self.guard.nonces().issue().await.unwrap();
        let ts = self.clock.now().timestamp().to_string();

        let mut params: Params = extra
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        params.insert("nonce".into(), nonce.clone());
        params.insert("timestamp".into(), ts.clone());
        let sign = self
            .guard
            .signer()
            .sign(&SignedRequest::new(params.clone()).canonical_params(&ts, &nonce));
        params.insert("sign".into(), sign);

        params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn bearer(&self) -> String {
        let pair = self.guard.tokens().issue_pair("sub-7", "carol", "admin").unwrap();
        format!("Bearer {}", pair.access_token)
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get_request(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(auth) = authorization {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_signed_request_admitted_then_replay_rejected() {
    let app = app();
    let uri = format!("/me?{}", app.signed_query(&[("zone", "hall")]).await);
    let bearer = app.bearer();

    let response = app
        .router
        .clone()
        .oneshot(get_request(&uri, Some(&bearer)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["subject"], "sub-7");
    assert_eq!(body["role"], "admin");

    let replay = app
        .router
        .clone()
        .oneshot(get_request(&uri, Some(&bearer)))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
    let body = body_json(replay).await;
    assert_eq!(body["error"]["code"], "INVALID_NONCE");
}

#[tokio::test]
async fn test_missing_timestamp_rejected() {
    let app = app();
    let response = app
        .router
        .oneshot(get_request("/me?nonce=abc&sign=ff", Some("Bearer x")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "MISSING_FIELD");
}

#[tokio::test]
async fn test_signed_but_no_bearer_rejected() {
    let app = app();
    let uri = format!("/me?{}", app.signed_query(&[]).await);

    let response = app.router.oneshot(get_request(&uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "MISSING_CREDENTIAL");
}

#[tokio::test]
async fn test_signed_with_basic_scheme_is_unauthorized() {
    let app = app();
    let uri = format!("/me?{}", app.signed_query(&[]).await);

    let response = app
        .router
        .oneshot(get_request(&uri, Some("Basic Y2Fyb2w6cHc=")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "MALFORMED_TOKEN");
}

#[tokio::test]
async fn test_expired_bearer_is_unauthorized() {
    let app = app();
    let bearer = app.bearer();
    app.clock.advance(chrono::Duration::days(2));
    let uri = format!("/me?{}", app.signed_query(&[]).await);

    let response = app
        .router
        .oneshot(get_request(&uri, Some(&bearer)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_tampered_query_rejected() {
    let app = app();
    let query = app.signed_query(&[("zone", "hall")]).await.replace("zone=hall", "zone=attic");
    let bearer = app.bearer();

    let response = app
        .router
        .oneshot(get_request(&format!("/me?{query}"), Some(&bearer)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn test_exempt_path_skips_checks() {
    let app = app();
    let response = app.router.oneshot(get_request("/public", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"guest");
}
