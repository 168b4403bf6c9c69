//! Outbox processor lifecycle
//!
//! `OutboxProcessor` is the only surface embedding code needs: construct it
//! with a configuration and the two adapters, then `start()` and `stop()` it
//! as often as required.

use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ProcessorConfig;
use crate::error::ProcessorError;
use crate::repository::{DispatchClient, OutboxRepository};
use crate::scheduler::OutboxPoller;
use crate::service::BatchDispatcher;

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Background component turning outbox rows into dispatched jobs
pub struct OutboxProcessor {
    config: ProcessorConfig,
    repository: Arc<dyn OutboxRepository>,
    client: Arc<dyn DispatchClient>,
    wake: Arc<Notify>,
    // Held across `stop()` so a concurrent `start()` cannot overlap a draining loop
    running: Mutex<Option<RunningLoop>>,
}

impl OutboxProcessor {
    pub fn new(
        config: ProcessorConfig,
        repository: Arc<dyn OutboxRepository>,
        client: Arc<dyn DispatchClient>,
    ) -> Self {
        Self {
            config,
            repository,
            client,
            wake: Arc::new(Notify::new()),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Starts the poll loop in the background and returns immediately
    ///
    /// A no-op if the loop is already running. Configuration errors are the
    /// only failure; once started, the loop never surfaces errors to callers.
    pub async fn start(&self) -> Result<(), ProcessorError> {
        let mut running = self.running.lock().await;

        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!(processor_id = %self.config.processor_id, "Outbox processor already running");
            return Ok(());
        }

        self.config.validate()?;

        let dispatcher = BatchDispatcher::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.client),
            self.config.worker_concurrency,
            self.config.retry.clone(),
        );
        let poller = OutboxPoller::new(self.config.clone(), Arc::clone(&self.repository), dispatcher);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            let wake = Arc::clone(&self.wake);
            async move { poller.run(cancel, wake).await }
        });

        *running = Some(RunningLoop { cancel, handle });
        info!(processor_id = %self.config.processor_id, "Outbox processor started");
        Ok(())
    }

    /// Stops the poll loop
    ///
    /// Interrupts the sleep between cycles but lets an in-flight batch finish,
    /// so every claimed entry is resolved before this returns. A no-op if the
    /// processor is not running.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(RunningLoop { cancel, handle }) = running.take() else {
            return;
        };

        info!(processor_id = %self.config.processor_id, "Stopping outbox processor");
        cancel.cancel();

        if let Err(e) = handle.await {
            error!(error = %e, "Outbox poll loop terminated abnormally");
        }
        info!(processor_id = %self.config.processor_id, "Outbox processor stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Asks the poll loop to poll now instead of finishing its current sleep
    ///
    /// Producers may call this after committing new entries. It never starts
    /// a cycle while another one is running.
    pub fn notify(&self) {
        self.wake.notify_one();
    }
}

impl Drop for OutboxProcessor {
    fn drop(&mut self) {
        // Without an await point the loop can only be told to stop, not joined
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
        }
    }
}
