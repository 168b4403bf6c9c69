//! Outbox entry DTOs

use serde::{Deserialize, Serialize};

/// A new outbox row as written by the workflow engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOutboxEntry {
    pub kind: String,
    pub payload: serde_json::Value,
    pub correlation_id: String,
}

impl NewOutboxEntry {
    pub fn new(
        kind: impl Into<String>,
        payload: serde_json::Value,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            payload,
            correlation_id: correlation_id.into(),
        }
    }
}
