//! Credential kinds and token pairs

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of an identity credential.
///
/// The kind is part of the signed claim set, so an access token can never
/// be reinterpreted as a refresh token or the other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived credential for API calls
    Access,
    /// Long-lived credential used only to mint new pairs
    Refresh,
}

impl TokenKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown token kind
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown token kind: {0}")]
pub struct ParseTokenKindError(pub String);

impl FromStr for TokenKind {
    type Err = ParseTokenKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(Self::Access),
            "refresh" => Ok(Self::Refresh),
            other => Err(ParseTokenKindError(other.to_string())),
        }
    }
}

/// Matched access / refresh pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    /// Always "Bearer"
    pub token_type: String,
}

impl TokenPair {
    /// Build a pair with the bearer token type
    pub fn bearer(access_token: String, refresh_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            token_type: "Bearer".to_string(),
        }
    }
}
