//! Schema bootstrap

use sqlx::PgPool;

use crate::error::DbResult;

/// Create the nonce table and its expiry index if they are missing
pub async fn ensure_schema(pool: &PgPool) -> DbResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nonces (
            nonce      TEXT PRIMARY KEY,
            expires_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS nonces_expires_at_idx ON nonces (expires_at)")
        .execute(pool)
        .await?;

    tracing::debug!("Nonce schema ready");
    Ok(())
}
