//! HTTP handlers

mod auth;
mod health;

pub use auth::{issue_nonce, login, me, refresh};
pub use health::{health, ready};
