//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A live row with the same key already exists
    #[error("duplicate key")]
    Conflict,
}

/// Result alias for repository operations
pub type DbResult<T> = Result<T, DbError>;
