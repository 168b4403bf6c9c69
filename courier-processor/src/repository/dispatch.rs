//! Execution backend contract
//!
//! Turns an outbox entry into a job on the execution backend and classifies
//! the result as dispatched, transient failure or permanent failure.

use async_trait::async_trait;
use courier_client::{ClientError, ExecutionClient};
use courier_core::domain::entry::OutboxEntry;
use courier_core::domain::outcome::DispatchOutcome;
use courier_core::dto::submit::SubmitJobRequest;
use tracing::debug;

/// Client trait for submitting one logical job per outbox entry
///
/// Implementations must tolerate being called more than once for the same
/// entry; delivery is at-least-once and the backend de-duplicates by entry id.
/// Implementations enforce their own timeouts and report them as transient.
#[async_trait]
pub trait DispatchClient: Send + Sync {
    async fn submit(&self, entry: &OutboxEntry) -> DispatchOutcome;
}

/// HTTP implementation of DispatchClient
pub struct HttpDispatchClient {
    client: ExecutionClient,
}

impl HttpDispatchClient {
    pub fn new(client: ExecutionClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DispatchClient for HttpDispatchClient {
    async fn submit(&self, entry: &OutboxEntry) -> DispatchOutcome {
        match self.client.submit_job(&SubmitJobRequest::from(entry)).await {
            Ok(ack) => {
                debug!(entry_id = %entry.id, job_id = %ack.job_id, "Job accepted");
                DispatchOutcome::Dispatched
            }
            Err(err) => classify(err),
        }
    }
}

/// Maps a client error onto the dispatch outcome taxonomy
fn classify(err: ClientError) -> DispatchOutcome {
    if err.is_duplicate() {
        // Backend already holds a job under this entry's idempotency key
        return DispatchOutcome::Dispatched;
    }

    if err.is_transient() {
        DispatchOutcome::TransientFailure(err.to_string())
    } else {
        DispatchOutcome::PermanentFailure(err.to_string())
    }
}
