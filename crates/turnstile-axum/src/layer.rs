//! Tower middleware layers for the Turnstile protocol.
//!
//! [`SignedRequestLayer`] runs freshness, nonce and signature checks.
//! [`BearerAuthLayer`] validates the access credential and attaches an
//! [`AuthContext`]. Both skip paths listed in their [`ExemptPaths`].

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use tower::{Layer, Service};
use turnstile_auth_core::RequestGuard;
use turnstile_db::NonceRepository;

use crate::context::AuthContext;
use crate::error::AuthRejection;
use crate::params::{extract_signed_request, DEFAULT_BODY_LIMIT};

const ADMITTED_METRIC: &str = "turnstile_requests_admitted_total";
const REJECTED_METRIC: &str = "turnstile_requests_rejected_total";

/// Paths a layer passes through untouched. Matched exactly against the
/// path the layer sees (after any `nest` prefix is stripped).
#[derive(Debug, Clone)]
pub struct ExemptPaths(Arc<[String]>);

impl Default for ExemptPaths {
    fn default() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl ExemptPaths {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self(paths.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.iter().any(|p| p == path)
    }
}

fn reject(rejection: AuthRejection) -> Response {
    tracing::debug!(code = rejection.code(), "Request rejected");
    metrics::counter!(REJECTED_METRIC, "code" => rejection.code()).increment(1);
    rejection.into_response()
}

// ============================================================================
// Signed request layer
// ============================================================================

/// Tower layer enforcing timestamp, nonce and signature checks.
pub struct SignedRequestLayer<R: NonceRepository> {
    guard: RequestGuard<R>,
    exempt: ExemptPaths,
    body_limit: usize,
}

impl<R: NonceRepository> Clone for SignedRequestLayer<R> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            exempt: self.exempt.clone(),
            body_limit: self.body_limit,
        }
    }
}

impl<R: NonceRepository> SignedRequestLayer<R> {
    /// Create a new layer over the given guard.
    #[must_use]
    pub fn new(guard: RequestGuard<R>) -> Self {
        Self {
            guard,
            exempt: ExemptPaths::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Set the paths that skip the checks.
    #[must_use]
    pub fn exempt(mut self, exempt: ExemptPaths) -> Self {
        self.exempt = exempt;
        self
    }

    /// Set the largest form body buffered for signing.
    #[must_use]
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

impl<S, R: NonceRepository> Layer<S> for SignedRequestLayer<R> {
    type Service = SignedRequestService<S, R>;

    fn layer(&self, inner: S) -> Self::Service {
        SignedRequestService {
            inner,
            layer: self.clone(),
        }
    }
}

/// The signed request checking service.
pub struct SignedRequestService<S, R: NonceRepository> {
    inner: S,
    layer: SignedRequestLayer<R>,
}

impl<S: Clone, R: NonceRepository> Clone for SignedRequestService<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            layer: self.layer.clone(),
        }
    }
}

impl<S, R> Service<Request<Body>> for SignedRequestService<S, R>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    R: NonceRepository + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Take the service that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if self.layer.exempt.contains(req.uri().path()) {
            return Box::pin(inner.call(req));
        }

        let layer = self.layer.clone();
        Box::pin(async move {
            let (req, signed) = match extract_signed_request(req, layer.body_limit).await {
                Ok(extracted) => extracted,
                Err(rejection) => return Ok(reject(rejection)),
            };

            if let Err(e) = layer.guard.verify_signed(&signed).await {
                return Ok(reject(e.into()));
            }

            metrics::counter!(ADMITTED_METRIC).increment(1);
            inner.call(req).await
        })
    }
}

// ============================================================================
// Bearer credential layer
// ============================================================================

/// Tower layer requiring a bearer access credential.
pub struct BearerAuthLayer<R: NonceRepository> {
    guard: RequestGuard<R>,
    exempt: ExemptPaths,
}

impl<R: NonceRepository> Clone for BearerAuthLayer<R> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            exempt: self.exempt.clone(),
        }
    }
}

impl<R: NonceRepository> BearerAuthLayer<R> {
    /// Create a new layer over the given guard.
    #[must_use]
    pub fn new(guard: RequestGuard<R>) -> Self {
        Self {
            guard,
            exempt: ExemptPaths::default(),
        }
    }

    /// Set the paths that skip the check.
    #[must_use]
    pub fn exempt(mut self, exempt: ExemptPaths) -> Self {
        self.exempt = exempt;
        self
    }
}

impl<S, R: NonceRepository> Layer<S> for BearerAuthLayer<R> {
    type Service = BearerAuthService<S, R>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService {
            inner,
            layer: self.clone(),
        }
    }
}

/// The bearer credential checking service.
pub struct BearerAuthService<S, R: NonceRepository> {
    inner: S,
    layer: BearerAuthLayer<R>,
}

impl<S: Clone, R: NonceRepository> Clone for BearerAuthService<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            layer: self.layer.clone(),
        }
    }
}

impl<S, R> Service<Request<Body>> for BearerAuthService<S, R>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    R: NonceRepository + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if self.layer.exempt.contains(req.uri().path()) {
            return Box::pin(inner.call(req));
        }

        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        match self.layer.guard.authenticate_bearer(authorization) {
            Ok(identity) => {
                tracing::debug!(subject = %identity.subject, "Bearer credential accepted");
                req.extensions_mut().insert(AuthContext::new(identity));
                Box::pin(inner.call(req))
            }
            Err(e) => {
                let response = reject(e.into());
                Box::pin(async move { Ok(response) })
            }
        }
    }
}
