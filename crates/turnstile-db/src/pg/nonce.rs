//! PostgreSQL nonce repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{DbError, DbResult};
use crate::repo::{NewNonce, NonceRepository};

/// PostgreSQL nonce repository
#[derive(Clone)]
pub struct PgNonceRepository {
    pool: PgPool,
}

impl PgNonceRepository {
    /// Create a new nonce repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NonceRepository for PgNonceRepository {
    async fn insert(&self, nonce: NewNonce) -> DbResult<()> {
        let result = sqlx::query("INSERT INTO nonces (nonce, expires_at) VALUES ($1, $2)")
            .bind(&nonce.value)
            .bind(nonce.expires_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(DbError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn consume(&self, value: &str, now: DateTime<Utc>) -> DbResult<bool> {
        // Lookup and removal happen in one statement; only one concurrent
        // caller can get the row back.
        let removed = sqlx::query_scalar::<_, String>(
            r#"
            DELETE FROM nonces
            WHERE nonce = $1 AND expires_at >= $2
            RETURNING nonce
            "#,
        )
        .bind(value)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(removed.is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM nonces WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
