//! Single-use nonce issuance and claiming
//!
//! A nonce is live while `now <= expires_at`. Claiming goes through
//! [`NonceRepository::consume`], which removes the row in one atomic step,
//! so two requests racing on the same captured nonce cannot both succeed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::task::JoinHandle;
use turnstile_db::{DbError, NewNonce, NonceRepository};

use crate::clock::SharedClock;
use crate::config::AuthConfig;
use crate::AuthError;

/// Random bytes per nonce (hex-encoded to twice as many characters)
pub const NONCE_BYTES: usize = 16;

/// Longest value `claim` will send to the store
pub const MAX_NONCE_LENGTH: usize = 128;

/// Generate a fresh nonce value from the OS RNG
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Nonce service over a durable repository
pub struct NonceService<R: NonceRepository> {
    repo: Arc<R>,
    clock: SharedClock,
    ttl: ChronoDuration,
    timeout: Duration,
}

impl<R: NonceRepository> Clone for NonceService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            clock: Arc::clone(&self.clock),
            ttl: self.ttl,
            timeout: self.timeout,
        }
    }
}

impl<R: NonceRepository + 'static> NonceService<R> {
    /// Create a new nonce service
    pub fn new(config: &AuthConfig, clock: SharedClock, repo: Arc<R>) -> Result<Self, AuthError> {
        let ttl = ChronoDuration::from_std(config.nonce_ttl)
            .map_err(|_| AuthError::Configuration("nonce lifetime out of range".to_string()))?;
        Ok(Self {
            repo,
            clock,
            ttl,
            timeout: config.store_timeout,
        })
    }

    /// Generate and durably record a nonce.
    ///
    /// A collision with a stored value surfaces as `Store`; callers retry.
    pub async fn issue(&self) -> Result<String, AuthError> {
        let value = generate_nonce();
        let expires_at = self.clock.now() + self.ttl;

        let insert = self.repo.insert(NewNonce {
            value: value.clone(),
            expires_at,
        });

        match bounded(self.timeout, insert).await? {
            Ok(()) => {
                tracing::debug!(expires_at = %expires_at, "Nonce issued");
                Ok(value)
            }
            Err(DbError::Conflict) => {
                tracing::warn!("Nonce collision on issue");
                Err(AuthError::Store("nonce collision, retry".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically claim a nonce.
    ///
    /// Never issued, already claimed and expired all report `InvalidNonce`.
    /// The store call runs on its own task: dropping the returned future
    /// does not interrupt a claim that is already in flight.
    pub async fn claim(&self, value: &str) -> Result<(), AuthError> {
        if value.is_empty() || value.len() > MAX_NONCE_LENGTH {
            return Err(AuthError::InvalidNonce);
        }

        let repo = Arc::clone(&self.repo);
        let value = value.to_owned();
        let now = self.clock.now();
        let timeout = self.timeout;

        let task = tokio::spawn(async move { bounded(timeout, repo.consume(&value, now)).await });

        let consumed = task.await.map_err(|e| {
            tracing::error!("Nonce claim task failed: {}", e);
            AuthError::Internal("nonce claim task failed".to_string())
        })??;

        if consumed? {
            Ok(())
        } else {
            tracing::warn!("Rejected unknown, used or expired nonce");
            Err(AuthError::InvalidNonce)
        }
    }

    /// Delete expired nonces. Space reclamation only; `claim` already
    /// rejects expired values.
    pub async fn sweep(&self) -> Result<u64, AuthError> {
        let now = self.clock.now();
        let removed = bounded(self.timeout, self.repo.delete_expired(now)).await??;
        Ok(removed)
    }

    /// Check that the backing store answers within the timeout
    pub async fn check_store(&self) -> Result<(), AuthError> {
        bounded(self.timeout, self.repo.ping()).await??;
        Ok(())
    }

    /// Run [`sweep`](Self::sweep) every `period` on a background task
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                match service.sweep().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "Swept expired nonces"),
                    Err(e) => tracing::error!(error = %e, "Nonce sweep failed"),
                }
            }
        })
    }
}

impl<R: NonceRepository> std::fmt::Debug for NonceService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceService")
            .field("ttl_secs", &self.ttl.num_seconds())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Apply the store timeout; an elapsed timeout is a store failure
async fn bounded<T>(timeout: Duration, fut: impl Future<Output = T>) -> Result<T, AuthError> {
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        tracing::error!(timeout_ms = timeout.as_millis() as u64, "Nonce store call timed out");
        AuthError::Store("nonce store timed out".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use turnstile_db::{DbResult, MemoryNonceRepository};

    /// Store that never answers
    struct StalledRepository;

    #[async_trait]
    impl NonceRepository for StalledRepository {
        async fn insert(&self, _nonce: NewNonce) -> DbResult<()> {
            std::future::pending().await
        }

        async fn consume(&self, _value: &str, _now: DateTime<Utc>) -> DbResult<bool> {
            std::future::pending().await
        }

        async fn delete_expired(&self, _now: DateTime<Utc>) -> DbResult<u64> {
            std::future::pending().await
        }

        async fn ping(&self) -> DbResult<()> {
            std::future::pending().await
        }
    }

    /// Memory store whose consume takes a while to land
    struct SlowConsumeRepository {
        inner: MemoryNonceRepository,
        delay: Duration,
    }

    #[async_trait]
    impl NonceRepository for SlowConsumeRepository {
        async fn insert(&self, nonce: NewNonce) -> DbResult<()> {
            self.inner.insert(nonce).await
        }

        async fn consume(&self, value: &str, now: DateTime<Utc>) -> DbResult<bool> {
            tokio::time::sleep(self.delay).await;
            self.inner.consume(value, now).await
        }

        async fn delete_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
            self.inner.delete_expired(now).await
        }

        async fn ping(&self) -> DbResult<()> {
            self.inner.ping().await
        }
    }

    fn service(clock: Arc<FixedClock>) -> (NonceService<MemoryNonceRepository>, MemoryNonceRepository) {
        let repo = MemoryNonceRepository::new();
        let config = AuthConfig::new("k".repeat(32));
        let service = NonceService::new(&config, clock, Arc::new(repo.clone())).unwrap();
        (service, repo)
    }

    #[test]
    fn test_generated_nonce_shape() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_BYTES * 2);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(nonce, generate_nonce());
    }

    #[tokio::test]
    async fn test_issue_then_claim_once() {
        let (service, _) = service(Arc::new(FixedClock::starting_now()));
        let nonce = service.issue().await.unwrap();

        assert!(service.claim(&nonce).await.is_ok());
        assert!(matches!(service.claim(&nonce).await, Err(AuthError::InvalidNonce)));
    }

    #[tokio::test]
    async fn test_unknown_nonce_rejected() {
        let (service, _) = service(Arc::new(FixedClock::starting_now()));
        assert!(matches!(
            service.claim("never-issued").await,
            Err(AuthError::InvalidNonce)
        ));
    }

    #[tokio::test]
    async fn test_empty_and_oversized_rejected_without_store() {
        let (service, _) = service(Arc::new(FixedClock::starting_now()));
        assert!(matches!(service.claim("").await, Err(AuthError::InvalidNonce)));
        let long = "a".repeat(MAX_NONCE_LENGTH + 1);
        assert!(matches!(service.claim(&long).await, Err(AuthError::InvalidNonce)));
    }

    #[tokio::test]
    async fn test_expired_nonce_rejected_even_if_unclaimed() {
        let clock = Arc::new(FixedClock::starting_now());
        let (service, _) = service(clock.clone());
        let nonce = service.issue().await.unwrap();

        clock.advance(ChronoDuration::seconds(121));
        assert!(matches!(service.claim(&nonce).await, Err(AuthError::InvalidNonce)));
    }

    #[tokio::test]
    async fn test_claim_at_exact_expiry_accepted() {
        let clock = Arc::new(FixedClock::starting_now());
        let (service, _) = service(clock.clone());
        let nonce = service.issue().await.unwrap();

        clock.advance(ChronoDuration::seconds(120));
        assert!(service.claim(&nonce).await.is_ok());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let clock = Arc::new(FixedClock::starting_now());
        let (service, repo) = service(clock.clone());
        service.issue().await.unwrap();
        service.issue().await.unwrap();

        clock.advance(ChronoDuration::seconds(60));
        let live = service.issue().await.unwrap();

        clock.advance(ChronoDuration::seconds(61));
        assert_eq!(service.sweep().await.unwrap(), 2);
        assert_eq!(repo.len(), 1);
        assert!(service.claim(&live).await.is_ok());
    }

    #[tokio::test]
    async fn test_stalled_store_surfaces_as_store_error() {
        let config = AuthConfig::new("k".repeat(32)).with_store_timeout(Duration::from_millis(50));
        let service = NonceService::new(
            &config,
            Arc::new(FixedClock::starting_now()),
            Arc::new(StalledRepository),
        )
        .unwrap();

        assert!(matches!(service.issue().await, Err(AuthError::Store(_))));
        assert!(matches!(service.claim("abc").await, Err(AuthError::Store(_))));
        assert!(matches!(service.sweep().await, Err(AuthError::Store(_))));
        assert!(matches!(service.check_store().await, Err(AuthError::Store(_))));
    }

    #[tokio::test]
    async fn test_dropped_claim_still_consumes() {
        let inner = MemoryNonceRepository::new();
        let repo = SlowConsumeRepository {
            inner: inner.clone(),
            delay: Duration::from_millis(50),
        };
        let config = AuthConfig::new("k".repeat(32));
        let service =
            NonceService::new(&config, Arc::new(FixedClock::starting_now()), Arc::new(repo))
                .unwrap();
        let nonce = service.issue().await.unwrap();
        assert_eq!(inner.len(), 1);

        // Caller gives up while the store call is in flight
        let abandoned = tokio::time::timeout(Duration::from_millis(5), service.claim(&nonce)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(inner.len(), 0);
        assert!(matches!(service.claim(&nonce).await, Err(AuthError::InvalidNonce)));
    }
}
