//! Outbox store contract

use async_trait::async_trait;
use courier_core::domain::entry::{OutboxEntry, OutboxStatus};
use courier_core::domain::retry::RetryPolicy;
use std::time::Duration;
use uuid::Uuid;

use crate::error::StoreResult;

/// Repository trait for the processor's side of the outbox table
///
/// Every transition only applies to rows currently `processing` under the
/// caller's `claimed_by`, which keeps the lifecycle
/// `pending -> processing -> (processed | pending | failed)` intact no matter
/// how calls interleave. A processor whose claim was swept and taken over by
/// another processor can no longer touch the row.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Atomically claims up to `limit` claimable `pending` rows, oldest first
    ///
    /// Claimed rows are flipped to `processing` and stamped with
    /// `claimed_by`. Concurrent callers receive disjoint sets. An empty store
    /// yields an empty vector, not an error.
    async fn claim_batch(&self, limit: usize, claimed_by: &str) -> StoreResult<Vec<OutboxEntry>>;

    /// Marks a dispatched entry `processed` and stamps `processed_at`
    ///
    /// Returns `false` without changing anything if the entry is not
    /// `processing` under `claimed_by`, so a second call is a no-op.
    async fn mark_processed(&self, id: Uuid, claimed_by: &str) -> StoreResult<bool>;

    /// Records a transient failure
    ///
    /// Increments `attempt_count` and stores `error`; the entry becomes
    /// `failed` once the policy's budget is spent, `pending` otherwise.
    /// Returns the resulting status, or `None` if the entry was not
    /// `processing` under `claimed_by`.
    async fn mark_retry(
        &self,
        id: Uuid,
        claimed_by: &str,
        error: &str,
        policy: &RetryPolicy,
    ) -> StoreResult<Option<OutboxStatus>>;

    /// Records a permanent failure: `failed` regardless of remaining budget
    async fn mark_failed(&self, id: Uuid, claimed_by: &str, error: &str) -> StoreResult<bool>;

    /// Returns rows stuck in `processing` for longer than `older_than` to
    /// `pending`. Returns how many rows were reclaimed.
    async fn reclaim_stale(&self, older_than: Duration) -> StoreResult<u64>;

    /// Deletes `processed` and `failed` rows that finished more than
    /// `older_than` ago. Returns how many rows were removed.
    async fn purge_terminal(&self, older_than: Duration) -> StoreResult<u64>;
}
