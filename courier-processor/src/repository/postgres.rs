//! PostgreSQL outbox repository

use async_trait::async_trait;
use chrono::Utc;
use courier_core::domain::entry::{OutboxEntry, OutboxStatus};
use courier_core::domain::retry::RetryPolicy;
use courier_store::entry_repository;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::OutboxRepository;
use crate::error::StoreResult;

/// Outbox repository backed by the `outbox_entries` table
///
/// Claim atomicity comes from `FOR UPDATE SKIP LOCKED`, so several processors
/// may share one database.
#[derive(Debug, Clone)]
pub struct PgOutboxRepository {
    pool: PgPool,
}

impl PgOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OutboxRepository for PgOutboxRepository {
    async fn claim_batch(&self, limit: usize, claimed_by: &str) -> StoreResult<Vec<OutboxEntry>> {
        Ok(entry_repository::claim_batch(&self.pool, limit, claimed_by).await?)
    }

    async fn mark_processed(&self, id: Uuid, claimed_by: &str) -> StoreResult<bool> {
        Ok(entry_repository::mark_processed(&self.pool, id, claimed_by).await?)
    }

    async fn mark_retry(
        &self,
        id: Uuid,
        claimed_by: &str,
        error: &str,
        policy: &RetryPolicy,
    ) -> StoreResult<Option<OutboxStatus>> {
        Ok(entry_repository::mark_retry(&self.pool, id, claimed_by, error, policy).await?)
    }

    async fn mark_failed(&self, id: Uuid, claimed_by: &str, error: &str) -> StoreResult<bool> {
        Ok(entry_repository::mark_failed(&self.pool, id, claimed_by, error).await?)
    }

    async fn reclaim_stale(&self, older_than: Duration) -> StoreResult<u64> {
        let Some(cutoff) = cutoff_before(older_than) else {
            return Ok(0);
        };
        Ok(entry_repository::reclaim_stale(&self.pool, cutoff).await?)
    }

    async fn purge_terminal(&self, older_than: Duration) -> StoreResult<u64> {
        let Some(cutoff) = cutoff_before(older_than) else {
            return Ok(0);
        };
        Ok(entry_repository::purge_terminal(&self.pool, cutoff).await?)
    }
}

/// `now - older_than`, or `None` when that lies before any representable time
fn cutoff_before(older_than: Duration) -> Option<chrono::DateTime<Utc>> {
    let age = chrono::TimeDelta::from_std(older_than).ok()?;
    Utc::now().checked_sub_signed(age)
}
