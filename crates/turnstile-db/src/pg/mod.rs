//! PostgreSQL repository implementations

mod nonce;

pub use nonce::PgNonceRepository;
