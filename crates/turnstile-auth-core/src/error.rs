//! Auth errors

use thiserror::Error;
use turnstile_types::TokenKind;

use crate::signature::SignatureMismatch;

/// Authentication errors
///
/// Request-shape and replay failures, credential failures and
/// infrastructure failures are kept apart so the HTTP layer can map them to
/// different statuses. Messages never include secret material.
#[derive(Error, Debug)]
pub enum AuthError {
    /// A required security field is absent
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A security field could not be parsed
    #[error("bad format: {0}")]
    BadFormat(&'static str),

    /// Timestamp outside the accepted window
    #[error("stale request: clock skew of {skew_secs}s exceeds {max_skew_secs}s")]
    StaleRequest { skew_secs: u64, max_skew_secs: u64 },

    /// Nonce never issued, already used, or expired
    #[error("invalid nonce")]
    InvalidNonce,

    /// Request tag does not match
    #[error("invalid signature")]
    InvalidSignature,

    /// No bearer credential presented
    #[error("missing credential")]
    MissingCredential,

    /// Credential cannot be parsed
    #[error("malformed token")]
    Malformed,

    /// Credential signature or issuer does not verify
    #[error("bad token signature")]
    BadSignature,

    /// Credential past its expiry
    #[error("token expired")]
    Expired,

    /// Credential before its not-before instant
    #[error("token not yet valid")]
    NotYetValid,

    /// Credential kind does not match the use
    #[error("wrong token kind: expected {expected}, got {actual}")]
    WrongTokenKind {
        expected: TokenKind,
        actual: TokenKind,
    },

    /// Username / password rejected by the identity store
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Nonce store unavailable or failing
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingField(_)
            | Self::BadFormat(_)
            | Self::StaleRequest { .. }
            | Self::InvalidNonce
            | Self::InvalidSignature => 400,
            Self::MissingCredential
            | Self::Malformed
            | Self::BadSignature
            | Self::Expired
            | Self::NotYetValid
            | Self::WrongTokenKind { .. }
            | Self::InvalidCredentials => 401,
            Self::Store(_) => 503,
            Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MISSING_FIELD",
            Self::BadFormat(_) => "BAD_FORMAT",
            Self::StaleRequest { .. } => "STALE_REQUEST",
            Self::InvalidNonce => "INVALID_NONCE",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::Malformed => "MALFORMED_TOKEN",
            Self::BadSignature => "BAD_TOKEN_SIGNATURE",
            Self::Expired => "TOKEN_EXPIRED",
            Self::NotYetValid => "TOKEN_NOT_YET_VALID",
            Self::WrongTokenKind { .. } => "WRONG_TOKEN_KIND",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Store(_) => "STORE_UNAVAILABLE",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure is a backend outage rather than a bad request
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Configuration(_) | Self::Internal(_)
        )
    }
}

impl From<SignatureMismatch> for AuthError {
    fn from(_: SignatureMismatch) -> Self {
        Self::InvalidSignature
    }
}

impl From<turnstile_db::DbError> for AuthError {
    fn from(err: turnstile_db::DbError) -> Self {
        tracing::error!("Nonce store error: {}", err);
        Self::Store(err.to_string())
    }
}
