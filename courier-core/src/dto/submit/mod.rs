//! Execution backend DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entry::OutboxEntry;

/// Job submission sent to the execution backend
///
/// `idempotency_key` is the outbox entry id, so a resubmitted entry can be
/// recognised downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub idempotency_key: Uuid,
    pub kind: String,
    pub arguments: serde_json::Value,
    pub correlation_id: String,
}

impl From<&OutboxEntry> for SubmitJobRequest {
    fn from(entry: &OutboxEntry) -> Self {
        Self {
            idempotency_key: entry.id,
            kind: entry.kind.clone(),
            arguments: entry.payload.clone(),
            correlation_id: entry.correlation_id.clone(),
        }
    }
}

/// Acknowledgement returned by the execution backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    /// Backend-side job identifier
    pub job_id: String,
}
