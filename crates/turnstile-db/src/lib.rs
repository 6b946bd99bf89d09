//! Turnstile DB - Nonce persistence
//!
//! SQLx-based storage for single-use nonces, plus an in-memory store with
//! the same atomic claim semantics for tests and single-process setups.
//!
//! # Example
//!
//! ```rust,ignore
//! use turnstile_db::{create_pool, ensure_schema, PgNonceRepository};
//!
//! let pool = create_pool("postgres://localhost/turnstile").await?;
//! ensure_schema(&pool).await?;
//! let nonces = PgNonceRepository::new(pool);
//! ```

pub mod error;
pub mod memory;
pub mod pg;
pub mod pool;
pub mod repo;
pub mod schema;

pub use error::{DbError, DbResult};
pub use memory::MemoryNonceRepository;
pub use pg::PgNonceRepository;
pub use pool::{create_pool, create_pool_with_options, DbPool, PoolOptions};
pub use repo::*;
pub use schema::ensure_schema;
