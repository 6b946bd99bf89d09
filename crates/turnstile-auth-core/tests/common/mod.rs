//! Common test utilities for turnstile-auth-core integration tests

#![allow(dead_code)]

use std::sync::Arc;

use turnstile_auth_core::{AuthConfig, FixedClock, Params, RequestGuard, SignedRequest};
use turnstile_db::MemoryNonceRepository;

pub const TEST_SECRET: &str = "integration-secret-0123456789abcdef";

pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub repo: Arc<MemoryNonceRepository>,
    pub guard: RequestGuard<MemoryNonceRepository>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AuthConfig::new(TEST_SECRET))
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let clock = Arc::new(FixedClock::starting_now());
        let repo = Arc::new(MemoryNonceRepository::new());
        let guard = RequestGuard::new(&config, clock.clone(), Arc::clone(&repo))
            .expect("test config is valid");
        Self { clock, repo, guard }
    }

    pub fn now_secs(&self) -> i64 {
        use turnstile_auth_core::Clock;
        self.clock.now().timestamp()
    }

    /// Fetch a nonce and sign `params` plus timestamp / nonce the way a
    /// client would
    pub async fn signed_request(&self, params: &[(&str, &str)]) -> SignedRequest {
        let nonce = self.guard.nonces().issue().await.expect("nonce issued");
        self.sign_with(params, &nonce, &self.now_secs().to_string())
    }

    pub fn sign_with(&self, params: &[(&str, &str)], nonce: &str, timestamp: &str) -> SignedRequest {
        let params: Params = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let request = SignedRequest::new(params)
            .with_nonce(nonce)
            .with_timestamp(timestamp);
        let sign = self
            .guard
            .signer()
            .sign(&request.canonical_params(timestamp, nonce));
        request.with_sign(sign)
    }
}
