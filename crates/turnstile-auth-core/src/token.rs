//! Access / refresh credential issuance and validation
//!
//! Credentials are HS256 JWTs. Signature and issuer are checked by
//! `jsonwebtoken`; time claims are checked here against the injected
//! [`Clock`](crate::clock::Clock) so expiry is exact and testable.

use chrono::Duration as ChronoDuration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use turnstile_types::{Identity, TokenKind, TokenPair};

use crate::clock::SharedClock;
use crate::config::AuthConfig;
use crate::AuthError;

/// Claims carried by every credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier
    pub sub: String,
    /// Contact attribute
    pub email: String,
    /// Role label
    pub role: String,
    /// Credential kind, signed like every other claim
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Not before (unix seconds)
    pub nbf: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Issuing authority
    pub iss: String,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    /// Identity asserted by these claims
    pub fn identity(&self) -> Identity {
        Identity::new(&self.sub, &self.email, &self.role)
    }

    /// Expired from the expiry instant on
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    pub fn is_not_yet_valid_at(&self, now: i64) -> bool {
        now < self.nbf
    }
}

/// Issues and verifies credential pairs
///
/// Stateless: holds only the keys, lifetimes and the clock.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl: ChronoDuration,
    refresh_ttl: ChronoDuration,
    clock: SharedClock,
}

impl TokenService {
    /// Create a new token service
    pub fn new(config: &AuthConfig, clock: SharedClock) -> Result<Self, AuthError> {
        config.validate()?;

        let access_ttl = ChronoDuration::from_std(config.access_token_ttl)
            .map_err(|_| AuthError::Configuration("access lifetime out of range".to_string()))?;
        let refresh_ttl = ChronoDuration::from_std(config.refresh_token_ttl)
            .map_err(|_| AuthError::Configuration("refresh lifetime out of range".to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub"]);
        // Time claims are checked against our clock in `verify`
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            access_ttl,
            refresh_ttl,
            clock,
        })
    }

    /// Access lifetime in seconds, as reported to clients
    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl.num_seconds().max(0) as u64
    }

    /// Issue a matched access / refresh pair for one identity
    pub fn issue_pair(
        &self,
        subject: &str,
        contact: &str,
        role: &str,
    ) -> Result<TokenPair, AuthError> {
        let identity = Identity::new(subject, contact, role);
        let access_token = self.mint(&identity, TokenKind::Access)?;
        let refresh_token = self.mint(&identity, TokenKind::Refresh)?;

        tracing::debug!(subject = %identity.subject, "Issued token pair");
        Ok(TokenPair::bearer(
            access_token,
            refresh_token,
            self.access_ttl_secs(),
        ))
    }

    /// Verify a credential and return its claims.
    ///
    /// Expiry is checked whenever the signature is valid; expired tokens
    /// are rejected regardless.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidIssuer => AuthError::BadSignature,
                _ => AuthError::Malformed,
            }
        })?;

        let claims = data.claims;
        let now = self.clock.now().timestamp();

        if claims.is_expired_at(now) {
            return Err(AuthError::Expired);
        }
        if claims.is_not_yet_valid_at(now) {
            return Err(AuthError::NotYetValid);
        }

        Ok(claims)
    }

    /// Verify a credential and require a specific kind
    pub fn verify_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let claims = self.verify(token)?;
        if claims.kind != expected {
            return Err(AuthError::WrongTokenKind {
                expected,
                actual: claims.kind,
            });
        }
        Ok(claims)
    }

    /// Mint a new pair from a valid refresh credential.
    ///
    /// The presented refresh token is not invalidated; it stays usable
    /// until its own expiry.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.verify_kind(refresh_token, TokenKind::Refresh)?;
        self.issue_pair(&claims.sub, &claims.email, &claims.role)
    }

    fn mint(&self, identity: &Identity, kind: TokenKind) -> Result<String, AuthError> {
        let now = self.clock.now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: identity.subject.clone(),
            email: identity.contact.clone(),
            role: identity.role.clone(),
            kind,
            iat: now,
            nbf: now,
            exp: now + ttl.num_seconds(),
            iss: self.issuer.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode token: {}", e);
            AuthError::Internal("failed to issue token".to_string())
        })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl.num_seconds())
            .field("refresh_ttl_secs", &self.refresh_ttl.num_seconds())
            .finish_non_exhaustive()
    }
}
