//! Repository traits
//!
//! Async storage interface for single-use nonces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbResult;

/// Nonce repository trait
///
/// Implementations must make [`consume`](NonceRepository::consume) a single
/// atomic operation: lookup and removal may never be observable as two
/// steps by a concurrent caller.
#[async_trait]
pub trait NonceRepository: Send + Sync {
    /// Record a new nonce. Fails with `DbError::Conflict` if the value exists.
    async fn insert(&self, nonce: NewNonce) -> DbResult<()>;

    /// Atomically remove `value` if it exists and `expires_at >= now`.
    ///
    /// Returns `true` only for the caller that removed the row.
    async fn consume(&self, value: &str, now: DateTime<Utc>) -> DbResult<bool>;

    /// Delete every nonce with `expires_at < now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> DbResult<u64>;

    /// Cheap reachability check for readiness probes
    async fn ping(&self) -> DbResult<()>;
}

/// Create nonce input
#[derive(Debug, Clone)]
pub struct NewNonce {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}
