//! Courier Processor
//!
//! Polls the PostgreSQL outbox and dispatches entries to the execution
//! backend over HTTP until interrupted.

use anyhow::{Context, Result};
use courier_client::ExecutionClient;
use courier_processor::repository::{HttpDispatchClient, PgOutboxRepository};
use courier_processor::{Config, OutboxProcessor};
use courier_store::{db, entry_repository};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_processor=info,courier_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Courier outbox processor");

    let config = load_config()?;
    info!(
        "Loaded configuration: processor_id={}, execution_url={}",
        config.processor.processor_id, config.execution_url
    );

    let pool = connect_with_retry(&config).await?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run outbox migrations")?;

    match entry_repository::count_by_status(&pool).await {
        Ok(counts) => {
            for (status, count) in counts {
                info!(%status, count, "Outbox backlog");
            }
        }
        Err(e) => warn!(error = %e, "Failed to read outbox backlog"),
    }

    let client = ExecutionClient::with_timeout(config.execution_url.clone(), config.execution_timeout)
        .context("Failed to build execution client")?;

    let processor = OutboxProcessor::new(
        config.processor.clone(),
        Arc::new(PgOutboxRepository::new(pool)),
        Arc::new(HttpDispatchClient::new(client)),
    );

    processor
        .start()
        .await
        .context("Failed to start outbox processor")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received, draining in-flight batch");
    processor.stop().await;

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            info!("Failed to load config from environment ({}), using defaults", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Connect to the database with exponential backoff
///
/// The database may not be ready yet when the processor starts (common in
/// container environments).
async fn connect_with_retry(config: &Config) -> Result<PgPool> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match db::create_pool(&config.database_url, config.max_connections).await {
            Ok(pool) => {
                if attempt > 1 {
                    info!("Connected to database after {} attempt(s)", attempt);
                }
                return Ok(pool);
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    error!("Failed to connect to database after {} attempts", MAX_RETRIES);
                    return Err(e).context("Failed to connect to database");
                }

                warn!(
                    "Failed to connect to database (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}
