//! Outbox poller
//!
//! Runs poll cycles back to back: claim a batch, dispatch it completely,
//! then sleep for an adaptive delay. A cycle never overlaps the next one.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ProcessorConfig;
use crate::error::StoreResult;
use crate::repository::OutboxRepository;
use crate::service::{BatchDispatcher, BatchReport};

/// Poll loop over one outbox store
pub struct OutboxPoller {
    config: ProcessorConfig,
    repository: Arc<dyn OutboxRepository>,
    dispatcher: BatchDispatcher,
}

impl OutboxPoller {
    /// Creates a new poller
    pub fn new(
        config: ProcessorConfig,
        repository: Arc<dyn OutboxRepository>,
        dispatcher: BatchDispatcher,
    ) -> Self {
        Self {
            config,
            repository,
            dispatcher,
        }
    }

    /// Runs poll cycles until `cancel` fires
    ///
    /// Cancellation only interrupts the sleep between cycles; a batch that has
    /// been claimed is always dispatched to the end. `wake` cuts a sleep
    /// short so freshly written entries are picked up early.
    pub async fn run(&self, cancel: CancellationToken, wake: Arc<Notify>) {
        info!(
            processor_id = %self.config.processor_id,
            batch_size = self.config.batch_size,
            workers = self.config.worker_concurrency,
            "Outbox poll loop started"
        );

        let mut delay = self.config.poll.min_delay;

        while !cancel.is_cancelled() {
            let found_work = match self.poll_once().await {
                Ok(Some(report)) => {
                    info!(
                        claimed = report.claimed,
                        processed = report.processed,
                        requeued = report.requeued,
                        failed = report.failed,
                        skipped = report.skipped,
                        unresolved = report.unresolved,
                        "Outbox batch dispatched"
                    );
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    warn!(error = %e, "Outbox poll cycle failed");
                    false
                }
            };

            delay = self.config.poll.next_delay(delay, found_work);
            debug!(?delay, found_work, "Next outbox poll scheduled");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = wake.notified() => debug!("Outbox poller woken early"),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(processor_id = %self.config.processor_id, "Outbox poll loop stopped");
    }

    /// Performs a single poll cycle
    ///
    /// Returns `None` when nothing was claimable.
    pub async fn poll_once(&self) -> StoreResult<Option<BatchReport>> {
        if let Some(timeout) = self.config.stale_claim_timeout {
            self.reclaim_stale(timeout).await;
        }
        if let Some(retention) = self.config.terminal_retention {
            self.purge_terminal(retention).await;
        }

        let batch = self
            .repository
            .claim_batch(self.config.batch_size, &self.config.processor_id)
            .await?;

        if batch.is_empty() {
            debug!("No outbox entries to dispatch");
            return Ok(None);
        }

        debug!(count = batch.len(), "Claimed outbox entries");
        Ok(Some(self.dispatcher.dispatch(batch).await))
    }

    async fn reclaim_stale(&self, timeout: Duration) {
        match self.repository.reclaim_stale(timeout).await {
            Ok(0) => {}
            Ok(count) => warn!(count, ?timeout, "Reclaimed stale outbox claims"),
            Err(e) => warn!(error = %e, "Failed to reclaim stale outbox claims"),
        }
    }

    async fn purge_terminal(&self, retention: Duration) {
        match self.repository.purge_terminal(retention).await {
            Ok(0) => {}
            Ok(count) => debug!(count, ?retention, "Purged finished outbox entries"),
            Err(e) => warn!(error = %e, "Failed to purge finished outbox entries"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryOutboxRepository;
    use crate::testing::{RecordingClient, new_entry};
    use courier_core::domain::entry::OutboxStatus;

    fn poller(repo: &InMemoryOutboxRepository, config: ProcessorConfig) -> OutboxPoller {
        let repository: Arc<dyn OutboxRepository> = Arc::new(repo.clone());
        let dispatcher = BatchDispatcher::new(
            Arc::clone(&repository),
            Arc::new(RecordingClient::accepting()),
            config.worker_concurrency,
            config.retry.clone(),
        );
        OutboxPoller::new(config, repository, dispatcher)
    }

    #[tokio::test]
    async fn test_poll_once_on_empty_store() {
        let repo = InMemoryOutboxRepository::new();
        let poller = poller(&repo, ProcessorConfig::new("processor-a"));

        assert_eq!(poller.poll_once().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_poll_once_respects_batch_size() {
        let repo = InMemoryOutboxRepository::new();
        for n in 0..7 {
            repo.enqueue(new_entry(n));
        }
        let mut config = ProcessorConfig::new("processor-a");
        config.batch_size = 5;
        let poller = poller(&repo, config);

        let report = poller.poll_once().await.unwrap().unwrap();
        assert_eq!(report.claimed, 5);
        assert_eq!(report.processed, 5);
        assert_eq!(repo.count_by_status(OutboxStatus::Pending), 2);

        let report = poller.poll_once().await.unwrap().unwrap();
        assert_eq!(report.claimed, 2);
        assert_eq!(poller.poll_once().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_poll_once_surfaces_store_outage() {
        let repo = InMemoryOutboxRepository::new();
        repo.set_unavailable(true);
        let poller = poller(&repo, ProcessorConfig::new("processor-a"));

        assert!(poller.poll_once().await.is_err());
    }

    #[tokio::test]
    async fn test_stale_claims_are_swept_before_claiming() {
        let repo = InMemoryOutboxRepository::new();
        let stuck = repo.enqueue(new_entry(0));
        repo.claim_batch(1, "crashed-processor").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut config = ProcessorConfig::new("processor-a");
        config.stale_claim_timeout = Some(Duration::from_millis(5));
        let poller = poller(&repo, config);

        let report = poller.poll_once().await.unwrap().unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(repo.get(stuck.id).unwrap().status, OutboxStatus::Processed);
    }

    #[tokio::test]
    async fn test_stale_claims_stay_without_sweep() {
        let repo = InMemoryOutboxRepository::new();
        let stuck = repo.enqueue(new_entry(0));
        repo.claim_batch(1, "crashed-processor").await.unwrap();

        let poller = poller(&repo, ProcessorConfig::new("processor-a"));

        assert_eq!(poller.poll_once().await.unwrap(), None);
        assert_eq!(repo.get(stuck.id).unwrap().status, OutboxStatus::Processing);
    }

    #[tokio::test]
    async fn test_finished_entries_are_purged_after_retention() {
        let repo = InMemoryOutboxRepository::new();
        for n in 0..3 {
            repo.enqueue(new_entry(n));
        }
        let mut config = ProcessorConfig::new("processor-a");
        config.terminal_retention = Some(Duration::from_millis(5));
        let poller = poller(&repo, config);

        assert_eq!(poller.poll_once().await.unwrap().unwrap().processed, 3);
        assert_eq!(repo.entries().len(), 3);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let fresh = repo.enqueue(new_entry(3));
        poller.poll_once().await.unwrap();

        let remaining = repo.entries();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, fresh.id);
        assert_eq!(remaining[0].status, OutboxStatus::Processed);
    }

    #[tokio::test]
    async fn test_run_exits_promptly_on_cancel() {
        let repo = InMemoryOutboxRepository::new();
        let mut config = ProcessorConfig::new("processor-a");
        config.poll.min_delay = Duration::from_secs(30);
        config.poll.max_delay = Duration::from_secs(30);
        let poller = Arc::new(poller(&repo, config));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let poller = Arc::clone(&poller);
            let cancel = cancel.clone();
            async move { poller.run(cancel, Arc::new(Notify::new())).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poll loop should stop while sleeping")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wake_cuts_sleep_short() {
        let repo = InMemoryOutboxRepository::new();
        let mut config = ProcessorConfig::new("processor-a");
        config.poll.min_delay = Duration::from_secs(30);
        config.poll.max_delay = Duration::from_secs(30);
        let poller = Arc::new(poller(&repo, config));

        let cancel = CancellationToken::new();
        let wake = Arc::new(Notify::new());
        let handle = tokio::spawn({
            let poller = Arc::clone(&poller);
            let cancel = cancel.clone();
            let wake = Arc::clone(&wake);
            async move { poller.run(cancel, wake).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        let entry = repo.enqueue(new_entry(1));
        wake.notify_one();

        let processed = crate::testing::wait_until(Duration::from_secs(2), || {
            repo.get(entry.id).is_some_and(|e| e.status == OutboxStatus::Processed)
        })
        .await;
        assert!(processed);

        cancel.cancel();
        handle.await.unwrap();
    }
}
