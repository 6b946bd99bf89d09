//! Turnstile Auth Core - Request authentication and anti-replay protocol
//!
//! Proves request freshness (timestamp window), uniqueness (single-use
//! nonces) and integrity (HMAC over a canonical parameter set), and issues
//! and validates access / refresh credential pairs.

pub mod clock;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod guard;
pub mod nonce;
pub mod service;
pub mod signature;
pub mod token;

pub use clock::*;
pub use config::*;
pub use credentials::*;
pub use crypto::*;
pub use error::*;
pub use guard::*;
pub use nonce::*;
pub use service::*;
pub use signature::*;
pub use token::*;

pub use turnstile_types::{Identity, TokenKind};
