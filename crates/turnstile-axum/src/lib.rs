//! Turnstile Axum Integration
//!
//! Axum middleware and extractors for the Turnstile request protocol.
//!
//! # Overview
//!
//! - **Layers**: [`SignedRequestLayer`] checks freshness, nonce and
//!   signature; [`BearerAuthLayer`] validates the access credential and
//!   attaches an [`AuthContext`]
//! - **Extractors**: [`RequireAuth`], [`MaybeAuth`]
//! - **Errors**: [`AuthRejection`] renders failures as JSON
//!
//! # Quick Start
//!
//! ```ignore
//! use turnstile_axum::{BearerAuthLayer, RequireAuth, SignedRequestLayer};
//! use axum::{Router, routing::get};
//!
//! async fn me(auth: RequireAuth) -> String {
//!     format!("Hello, {}!", auth.identity.contact)
//! }
//!
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .layer(BearerAuthLayer::new(guard.clone()))
//!     .layer(SignedRequestLayer::new(guard));
//! ```
//!
//! Layers added later run first, so the signature check precedes the
//! bearer check.

pub mod context;
pub mod error;
pub mod extractors;
pub mod layer;
pub mod params;

// Re-export primary types
pub use context::AuthContext;
pub use error::AuthRejection;
pub use extractors::{MaybeAuth, RequireAuth};
pub use layer::{
    BearerAuthLayer, BearerAuthService, ExemptPaths, SignedRequestLayer, SignedRequestService,
};
pub use params::{
    extract_signed_request, DEFAULT_BODY_LIMIT, NONCE_HEADER, SIGN_HEADER, TIMESTAMP_HEADER,
};
