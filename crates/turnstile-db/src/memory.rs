//! In-memory nonce repository
//!
//! Backed by a sharded concurrent map. Each operation holds the shard lock
//! for the key it touches, so `consume` is atomic per value.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{DbError, DbResult};
use crate::repo::{NewNonce, NonceRepository};

/// In-memory nonce repository
#[derive(Default, Clone)]
pub struct MemoryNonceRepository {
    entries: Arc<DashMap<String, DateTime<Utc>>>,
}

impl MemoryNonceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nonces, live or expired
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl NonceRepository for MemoryNonceRepository {
    async fn insert(&self, nonce: NewNonce) -> DbResult<()> {
        match self.entries.entry(nonce.value) {
            Entry::Occupied(_) => Err(DbError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(nonce.expires_at);
                Ok(())
            }
        }
    }

    async fn consume(&self, value: &str, now: DateTime<Utc>) -> DbResult<bool> {
        Ok(self
            .entries
            .remove_if(value, |_, expires_at| *expires_at >= now)
            .is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let mut removed = 0u64;
        self.entries.retain(|_, expires_at| {
            let keep = *expires_at >= now;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}

impl std::fmt::Debug for MemoryNonceRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNonceRepository")
            .field("len", &self.entries.len())
            .finish()
    }
}
