//! Per-request protocol: freshness, then nonce uniqueness, then integrity,
//! then (for identity routes) the bearer credential.
//!
//! Every step short-circuits. A nonce is spent as soon as step 3 passes,
//! so a request failing its signature check still burns its nonce.

use std::sync::Arc;

use turnstile_db::NonceRepository;
use turnstile_types::{Identity, TokenKind};

use crate::clock::SharedClock;
use crate::config::AuthConfig;
use crate::crypto::HmacKey;
use crate::nonce::NonceService;
use crate::signature::{Params, RequestSigner, SIGNATURE_PARAM};
use crate::token::TokenService;
use crate::AuthError;

/// Parameter name of the request timestamp
pub const TIMESTAMP_PARAM: &str = "timestamp";

/// Parameter name of the request nonce
pub const NONCE_PARAM: &str = "nonce";

/// Timestamps above this are read as milliseconds
pub const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Security-relevant view of one inbound request
///
/// `params` holds every request-carried field. `timestamp`, `nonce` and
/// `sign` are the resolved security values, which may have come from
/// headers rather than `params`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedRequest {
    pub params: Params,
    pub timestamp: Option<String>,
    pub nonce: Option<String>,
    pub sign: Option<String>,
}

impl SignedRequest {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_sign(mut self, sign: impl Into<String>) -> Self {
        self.sign = Some(sign.into());
        self
    }

    /// Parameter set the tag is computed over: every field except `sign`,
    /// with the resolved timestamp and nonce written in.
    pub fn canonical_params(&self, timestamp: &str, nonce: &str) -> Params {
        let mut params = self.params.clone();
        params.remove(SIGNATURE_PARAM);
        params.insert(TIMESTAMP_PARAM.to_string(), timestamp.to_string());
        params.insert(NONCE_PARAM.to_string(), nonce.to_string());
        params
    }
}

/// Parse a request timestamp into unix seconds
pub fn parse_timestamp(raw: &str) -> Result<i64, AuthError> {
    let value: i64 = raw
        .parse()
        .map_err(|_| AuthError::BadFormat(TIMESTAMP_PARAM))?;

    if value > MILLIS_THRESHOLD {
        Ok(value / 1000)
    } else {
        Ok(value)
    }
}

/// Composes the clock, nonce store, signer and token service
pub struct RequestGuard<R: NonceRepository> {
    nonces: NonceService<R>,
    signer: RequestSigner,
    tokens: TokenService,
    clock: SharedClock,
    max_skew_secs: u64,
}

impl<R: NonceRepository> Clone for RequestGuard<R> {
    fn clone(&self) -> Self {
        Self {
            nonces: self.nonces.clone(),
            signer: self.signer.clone(),
            tokens: self.tokens.clone(),
            clock: Arc::clone(&self.clock),
            max_skew_secs: self.max_skew_secs,
        }
    }
}

impl<R: NonceRepository + 'static> RequestGuard<R> {
    /// Create a new request guard
    pub fn new(config: &AuthConfig, clock: SharedClock, repo: Arc<R>) -> Result<Self, AuthError> {
        config.validate()?;

        let key =
            HmacKey::new(&config.secret_key).map_err(|e| AuthError::Configuration(e.to_string()))?;

        Ok(Self {
            nonces: NonceService::new(config, Arc::clone(&clock), repo)?,
            signer: RequestSigner::new(key),
            tokens: TokenService::new(config, Arc::clone(&clock))?,
            clock,
            max_skew_secs: config.max_clock_skew.as_secs(),
        })
    }

    pub fn nonces(&self) -> &NonceService<R> {
        &self.nonces
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    /// Steps 1-2: presence, parse and window check of the timestamp.
    ///
    /// Returns the timestamp in unix seconds. `|now - ts| == max_skew` is
    /// still fresh.
    pub fn check_freshness(&self, raw: Option<&str>) -> Result<i64, AuthError> {
        let raw = raw
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingField(TIMESTAMP_PARAM))?;
        let ts = parse_timestamp(raw)?;

        let now = self.clock.now().timestamp();
        let skew = now.abs_diff(ts);
        if skew > self.max_skew_secs {
            tracing::debug!(skew_secs = skew, "Rejected stale request");
            return Err(AuthError::StaleRequest {
                skew_secs: skew,
                max_skew_secs: self.max_skew_secs,
            });
        }

        Ok(ts)
    }

    /// Step 3: presence and atomic claim of the nonce
    pub async fn check_nonce(&self, raw: Option<&str>) -> Result<(), AuthError> {
        let nonce = raw
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingField(NONCE_PARAM))?;
        self.nonces.claim(nonce).await
    }

    /// Steps 1-4 over a request's parameter set
    pub async fn verify_signed(&self, request: &SignedRequest) -> Result<(), AuthError> {
        let timestamp = request.timestamp.as_deref();
        self.check_freshness(timestamp)?;

        let nonce = request.nonce.as_deref();
        self.check_nonce(nonce).await?;

        let sign = request
            .sign
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingField(SIGNATURE_PARAM))?;

        // Both were checked present above
        let params =
            request.canonical_params(timestamp.unwrap_or_default(), nonce.unwrap_or_default());
        self.signer.verify(&params, sign)?;

        Ok(())
    }

    /// Step 5: validate an `Authorization` header value as a bearer access
    /// credential
    pub fn authenticate_bearer(&self, authorization: Option<&str>) -> Result<Identity, AuthError> {
        let header = authorization
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Malformed)?;

        let claims = self.tokens.verify_kind(token, TokenKind::Access)?;
        Ok(claims.identity())
    }

    /// Full protocol for a protected identity route
    pub async fn admit(
        &self,
        request: &SignedRequest,
        authorization: Option<&str>,
    ) -> Result<Identity, AuthError> {
        self.verify_signed(request).await?;
        let identity = self.authenticate_bearer(authorization)?;
        tracing::debug!(subject = %identity.subject, "Request admitted");
        Ok(identity)
    }
}

impl<R: NonceRepository> std::fmt::Debug for RequestGuard<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGuard")
            .field("tokens", &self.tokens)
            .field("max_skew_secs", &self.max_skew_secs)
            .finish_non_exhaustive()
    }
}
