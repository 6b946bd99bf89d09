//! Bootstrap flows: nonce issuance, login and refresh
//!
//! These routes sit outside the request-signing middleware and run the
//! same freshness / uniqueness / integrity checks inline over their body
//! fields.

use std::sync::Arc;

use serde::Deserialize;
use turnstile_db::NonceRepository;
use turnstile_types::TokenPair;

use crate::credentials::CredentialStore;
use crate::guard::{RequestGuard, SignedRequest};
use crate::signature::Params;
use crate::AuthError;

/// Body of a login call
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub nonce: String,
    pub timestamp: String,
    pub sign: String,
}

impl LoginRequest {
    fn signed(&self) -> SignedRequest {
        let mut params = Params::new();
        params.insert("username".to_string(), self.username.clone());
        params.insert("password".to_string(), self.password.clone());
        signed_request(params, &self.nonce, &self.timestamp, &self.sign)
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

/// Body of a refresh call
#[derive(Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub nonce: String,
    pub timestamp: String,
    pub sign: String,
}

impl RefreshRequest {
    fn signed(&self) -> SignedRequest {
        let mut params = Params::new();
        params.insert("refresh_token".to_string(), self.refresh_token.clone());
        signed_request(params, &self.nonce, &self.timestamp, &self.sign)
    }
}

impl std::fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

fn signed_request(params: Params, nonce: &str, timestamp: &str, sign: &str) -> SignedRequest {
    SignedRequest::new(params)
        .with_nonce(nonce)
        .with_timestamp(timestamp)
        .with_sign(sign)
}

/// Authentication service
///
/// Owns the request guard and the credential store; the service binary
/// shares one instance across handlers and middleware.
pub struct AuthService<R: NonceRepository, C: CredentialStore> {
    guard: RequestGuard<R>,
    credentials: Arc<C>,
}

impl<R: NonceRepository, C: CredentialStore> Clone for AuthService<R, C> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            credentials: Arc::clone(&self.credentials),
        }
    }
}

impl<R: NonceRepository + 'static, C: CredentialStore> AuthService<R, C> {
    /// Create a new auth service
    pub fn new(guard: RequestGuard<R>, credentials: Arc<C>) -> Self {
        Self { guard, credentials }
    }

    pub fn guard(&self) -> &RequestGuard<R> {
        &self.guard
    }

    // =========================================================================
    // Bootstrap flows
    // =========================================================================

    /// Issue a nonce to a client whose clock is within the window
    pub async fn issue_nonce(&self, timestamp: Option<&str>) -> Result<String, AuthError> {
        self.guard.check_freshness(timestamp)?;
        self.guard.nonces().issue().await
    }

    /// Exchange account credentials for a token pair
    pub async fn login(&self, request: &LoginRequest) -> Result<TokenPair, AuthError> {
        self.guard.verify_signed(&request.signed()).await?;

        let identity = self
            .credentials
            .authenticate(&request.username, &request.password)
            .await?
            .ok_or_else(|| {
                tracing::warn!(username = %request.username, "Login rejected");
                AuthError::InvalidCredentials
            })?;

        tracing::info!(subject = %identity.subject, "Login succeeded");
        self.guard
            .tokens()
            .issue_pair(&identity.subject, &identity.contact, &identity.role)
    }

    /// Exchange a refresh credential for a new token pair
    pub async fn refresh(&self, request: &RefreshRequest) -> Result<TokenPair, AuthError> {
        self.guard.verify_signed(&request.signed()).await?;
        self.guard.tokens().refresh(&request.refresh_token)
    }
}

impl<R: NonceRepository, C: CredentialStore> std::fmt::Debug for AuthService<R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}
