//! Batch dispatcher
//!
//! Fans a claimed batch out to the execution backend with bounded
//! parallelism and writes every entry's outcome back to the outbox store.
//! Entries complete in any order; fairness across batches comes from the
//! store's oldest-first claims.

use courier_core::domain::entry::{OutboxEntry, OutboxStatus};
use courier_core::domain::outcome::DispatchOutcome;
use courier_core::domain::retry::RetryPolicy;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::repository::{DispatchClient, OutboxRepository};

/// Per-batch tally of outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub claimed: usize,
    /// Dispatched and marked `processed`
    pub processed: usize,
    /// Back to `pending` for a later cycle
    pub requeued: usize,
    /// Terminally `failed`
    pub failed: usize,
    /// Outcome known, but the row was no longer `processing` when written
    pub skipped: usize,
    /// Write-back failed; the row stays `processing`
    pub unresolved: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: EntryOutcome) {
        match outcome {
            EntryOutcome::Processed => self.processed += 1,
            EntryOutcome::Requeued => self.requeued += 1,
            EntryOutcome::Failed => self.failed += 1,
            EntryOutcome::Skipped => self.skipped += 1,
            EntryOutcome::Unresolved => self.unresolved += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Processed,
    Requeued,
    Failed,
    Skipped,
    Unresolved,
}

/// Drives claimed batches through the dispatch client
pub struct BatchDispatcher {
    repository: Arc<dyn OutboxRepository>,
    client: Arc<dyn DispatchClient>,
    retry: RetryPolicy,
    semaphore: Arc<Semaphore>,
}

impl BatchDispatcher {
    /// Creates a dispatcher allowing at most `worker_concurrency` in-flight
    /// submissions
    pub fn new(
        repository: Arc<dyn OutboxRepository>,
        client: Arc<dyn DispatchClient>,
        worker_concurrency: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            repository,
            client,
            retry,
            semaphore: Arc::new(Semaphore::new(worker_concurrency)),
        }
    }

    /// Dispatches every entry of `batch`
    ///
    /// Returns only once each entry has been processed, re-queued, failed, or
    /// (if the store went away) left `processing`. No entry is dropped.
    pub async fn dispatch(&self, batch: Vec<OutboxEntry>) -> BatchReport {
        let mut report = BatchReport {
            claimed: batch.len(),
            ..BatchReport::default()
        };
        let mut handles = Vec::with_capacity(batch.len());

        for entry in batch {
            let id = entry.id;
            let claimant = claim_owner(&entry).to_string();
            match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => handles.push((id, claimant, self.spawn_worker(entry, permit))),
                Err(_) => {
                    // The semaphore is never closed; requeue rather than drop
                    let outcome = record_retry(
                        self.repository.as_ref(),
                        id,
                        &claimant,
                        "worker pool closed",
                        &self.retry,
                    )
                    .await;
                    report.record(outcome);
                }
            }
        }

        for (id, claimant, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(entry_id = %id, error = %e, "Dispatch worker panicked");
                    let reason = format!("worker panicked: {}", e);
                    record_retry(self.repository.as_ref(), id, &claimant, &reason, &self.retry)
                        .await
                }
            };
            report.record(outcome);
        }

        report
    }

    /// Spawns a task submitting one entry; it holds `permit` until its
    /// outcome is written back
    fn spawn_worker(
        &self,
        entry: OutboxEntry,
        permit: OwnedSemaphorePermit,
    ) -> JoinHandle<EntryOutcome> {
        let repository = Arc::clone(&self.repository);
        let client = Arc::clone(&self.client);
        let retry = self.retry.clone();

        tokio::spawn(async move {
            let _permit = permit;
            dispatch_entry(repository.as_ref(), client.as_ref(), &retry, entry).await
        })
    }
}

/// The processor holding the claim; write-backs only apply under it
fn claim_owner(entry: &OutboxEntry) -> &str {
    entry.claimed_by.as_deref().unwrap_or_default()
}

/// Submits one entry and records the outcome
async fn dispatch_entry(
    repository: &dyn OutboxRepository,
    client: &dyn DispatchClient,
    retry: &RetryPolicy,
    entry: OutboxEntry,
) -> EntryOutcome {
    let id = entry.id;
    let claimant = claim_owner(&entry);

    match client.submit(&entry).await {
        DispatchOutcome::Dispatched => match repository.mark_processed(id, claimant).await {
            Ok(true) => {
                debug!(entry_id = %id, kind = %entry.kind, "Entry dispatched");
                EntryOutcome::Processed
            }
            Ok(false) => {
                warn!(entry_id = %id, "Dispatched entry was no longer processing");
                EntryOutcome::Skipped
            }
            Err(e) => {
                error!(entry_id = %id, error = %e, "Failed to mark entry processed");
                EntryOutcome::Unresolved
            }
        },
        DispatchOutcome::TransientFailure(reason) => {
            record_retry(repository, id, claimant, &reason, retry).await
        }
        DispatchOutcome::PermanentFailure(reason) => {
            match repository.mark_failed(id, claimant, &reason).await {
                Ok(true) => {
                    error!(entry_id = %id, kind = %entry.kind, error = %reason, "Entry rejected permanently");
                    EntryOutcome::Failed
                }
                Ok(false) => {
                    warn!(entry_id = %id, "Rejected entry was no longer processing");
                    EntryOutcome::Skipped
                }
                Err(e) => {
                    error!(entry_id = %id, error = %e, "Failed to mark entry failed");
                    EntryOutcome::Unresolved
                }
            }
        }
    }
}

/// Records a retryable failure; the store decides pending vs failed
async fn record_retry(
    repository: &dyn OutboxRepository,
    id: Uuid,
    claimant: &str,
    reason: &str,
    retry: &RetryPolicy,
) -> EntryOutcome {
    match repository.mark_retry(id, claimant, reason, retry).await {
        Ok(Some(OutboxStatus::Pending)) => {
            warn!(entry_id = %id, error = %reason, "Dispatch failed, entry re-queued");
            EntryOutcome::Requeued
        }
        Ok(Some(OutboxStatus::Failed)) => {
            error!(entry_id = %id, error = %reason, "Retry budget exhausted, entry failed");
            EntryOutcome::Failed
        }
        Ok(Some(status)) => {
            warn!(entry_id = %id, %status, "Unexpected status after retry");
            EntryOutcome::Skipped
        }
        Ok(None) => {
            warn!(entry_id = %id, "Retried entry was no longer processing");
            EntryOutcome::Skipped
        }
        Err(e) => {
            error!(entry_id = %id, error = %e, "Failed to record dispatch failure");
            EntryOutcome::Unresolved
        }
    }
}
