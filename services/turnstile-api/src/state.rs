//! Application state

use std::sync::Arc;

use turnstile_auth_core::{AuthService, RequestGuard, StaticCredentials};
use turnstile_db::{NonceRepository, PgNonceRepository};

use crate::config::Config;

/// Auth service over a given nonce store and the configured account
pub type AuthServiceImpl<R> = AuthService<R, StaticCredentials>;

/// Application state shared across handlers
pub struct AppState<R: NonceRepository = PgNonceRepository> {
    /// Nonce, login and refresh flows plus the request guard
    pub auth: Arc<AuthServiceImpl<R>>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl<R: NonceRepository> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            config: Arc::clone(&self.config),
        }
    }
}

impl<R: NonceRepository + 'static> AppState<R> {
    /// Create new application state
    pub fn new(auth: AuthServiceImpl<R>, config: Config) -> Self {
        Self {
            auth: Arc::new(auth),
            config: Arc::new(config),
        }
    }

    pub fn guard(&self) -> &RequestGuard<R> {
        self.auth.guard()
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}
