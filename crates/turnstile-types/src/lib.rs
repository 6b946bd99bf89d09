//! Turnstile Types - Shared domain types
//!
//! Types shared between the auth core, the axum integration and the
//! service binary:
//! - Authenticated identity (subject, contact, role)
//! - Credential kinds and issued token pairs

pub mod identity;
pub mod token;

pub use identity::*;
pub use token::*;
