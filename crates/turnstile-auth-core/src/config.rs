//! Configuration types for the auth core

use std::time::Duration;

use crate::crypto::HmacKey;
use crate::AuthError;

/// Auth core configuration
///
/// Built once at process start and passed into each component.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared secret for request tags and credential signatures (>= 32 bytes)
    pub secret_key: String,
    /// Issuing authority written to and required in the `iss` claim
    pub issuer: String,
    /// Access credential lifetime
    pub access_token_ttl: Duration,
    /// Refresh credential lifetime
    pub refresh_token_ttl: Duration,
    /// Nonce lifetime
    pub nonce_ttl: Duration,
    /// Maximum accepted |server time - request timestamp|
    pub max_clock_skew: Duration,
    /// Upper bound for a single nonce store call
    pub store_timeout: Duration,
}

impl AuthConfig {
    /// Default issuer label
    pub const DEFAULT_ISSUER: &'static str = "turnstile";

    /// Create a new auth config with default lifetimes
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            issuer: Self::DEFAULT_ISSUER.to_string(),
            access_token_ttl: Duration::from_secs(24 * 60 * 60), // 24 hours
            refresh_token_ttl: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
            nonce_ttl: Duration::from_secs(2 * 60),
            max_clock_skew: Duration::from_secs(60),
            store_timeout: Duration::from_secs(5),
        }
    }

    /// Create a new auth config, rejecting a short secret
    pub fn try_new(secret_key: impl Into<String>) -> Result<Self, AuthError> {
        let config = Self::new(secret_key);
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that constructors of the components rely on
    pub fn validate(&self) -> Result<(), AuthError> {
        HmacKey::new(&self.secret_key).map_err(|e| AuthError::Configuration(e.to_string()))?;

        if self.issuer.is_empty() {
            return Err(AuthError::Configuration("issuer must not be empty".to_string()));
        }
        if self.access_token_ttl.is_zero() || self.refresh_token_ttl.is_zero() {
            return Err(AuthError::Configuration(
                "token lifetimes must be positive".to_string(),
            ));
        }
        if self.access_token_ttl > self.refresh_token_ttl {
            return Err(AuthError::Configuration(
                "access lifetime must not exceed refresh lifetime".to_string(),
            ));
        }
        if self.nonce_ttl.is_zero() || self.store_timeout.is_zero() {
            return Err(AuthError::Configuration(
                "nonce lifetime and store timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the issuer label
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set access token lifetime
    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    /// Set refresh token lifetime
    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Set nonce lifetime
    pub fn with_nonce_ttl(mut self, ttl: Duration) -> Self {
        self.nonce_ttl = ttl;
        self
    }

    /// Set the accepted clock skew
    pub fn with_max_clock_skew(mut self, skew: Duration) -> Self {
        self.max_clock_skew = skew;
        self
    }

    /// Set the store call timeout
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("nonce_ttl", &self.nonce_ttl)
            .field("max_clock_skew", &self.max_clock_skew)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}
