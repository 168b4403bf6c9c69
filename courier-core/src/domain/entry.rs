//! Outbox entry domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One durable unit of deferred work
///
/// Rows are created `Pending` by the workflow engine inside its own
/// transaction. Every later transition belongs to the outbox processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Job kind understood by the execution backend (e.g. "process_documents")
    pub kind: String,
    /// Job arguments, opaque to the processor
    pub payload: serde_json::Value,
    /// Reference to the workflow instance that produced the entry
    pub correlation_id: String,
    pub status: OutboxStatus,
    pub attempt_count: u32,
    pub last_error: Option<String>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Earliest time the entry may be claimed again after a transient failure
    pub next_attempt_at: Option<chrono::DateTime<chrono::Utc>>,
    pub claimed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub claimed_by: Option<String>,
}

impl OutboxEntry {
    /// Whether the entry has left the claim cycle for good
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Outbox entry lifecycle status
///
/// `Pending -> Processing -> (Processed | Pending | Failed)`; a row never
/// jumps from `Pending` straight to `Processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

impl OutboxStatus {
    /// Column representation
    pub fn as_str(self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Processing => "processing",
            OutboxStatus::Processed => "processed",
            OutboxStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OutboxStatus::Processed | OutboxStatus::Failed)
    }
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "processing" => Ok(OutboxStatus::Processing),
            "processed" => Ok(OutboxStatus::Processed),
            "failed" => Ok(OutboxStatus::Failed),
            other => Err(format!("unknown outbox status: {}", other)),
        }
    }
}
