use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS outbox_entries (
            id UUID PRIMARY KEY,
            created_at TIMESTAMPTZ NOT NULL,
            kind VARCHAR(255) NOT NULL,
            payload JSONB NOT NULL DEFAULT '{}',
            correlation_id VARCHAR(255) NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'processing', 'processed', 'failed')),
            attempt_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            processed_at TIMESTAMPTZ,
            next_attempt_at TIMESTAMPTZ,
            claimed_at TIMESTAMPTZ,
            claimed_by VARCHAR(255),
            CHECK (processed_at IS NULL OR status = 'processed')
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Claim scans pending rows oldest first
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_outbox_pending ON outbox_entries(created_at) WHERE status = 'pending'",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_outbox_processing ON outbox_entries(claimed_at) WHERE status = 'processing'",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_outbox_correlation ON outbox_entries(correlation_id)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Outbox migrations completed successfully");
    Ok(())
}
