//! Shared fakes for unit tests

use async_trait::async_trait;
use chrono::Utc;
use courier_core::domain::entry::{OutboxEntry, OutboxStatus};
use courier_core::domain::outcome::DispatchOutcome;
use courier_core::dto::entry::NewOutboxEntry;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::repository::DispatchClient;

/// A freshly claimed entry that exists in no store
pub fn entry(kind: &str) -> OutboxEntry {
    OutboxEntry {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        kind: kind.to_string(),
        payload: serde_json::json!({ "documents": [1, 2, 3] }),
        correlation_id: "course-1".to_string(),
        status: OutboxStatus::Processing,
        attempt_count: 0,
        last_error: None,
        processed_at: None,
        next_attempt_at: None,
        claimed_at: Some(Utc::now()),
        claimed_by: Some("test".to_string()),
    }
}

pub fn new_entry(n: usize) -> NewOutboxEntry {
    NewOutboxEntry::new(
        "process_documents",
        serde_json::json!({ "document": n }),
        format!("course-{}", n),
    )
}

type Behaviour = Box<dyn Fn(&OutboxEntry) -> DispatchOutcome + Send + Sync>;

/// Dispatch client that records every call and answers from a closure
pub struct RecordingClient {
    behaviour: Behaviour,
    delay: Duration,
    calls: Mutex<Vec<Uuid>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingClient {
    pub fn new(behaviour: impl Fn(&OutboxEntry) -> DispatchOutcome + Send + Sync + 'static) -> Self {
        Self {
            behaviour: Box::new(behaviour),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Accepts everything
    pub fn accepting() -> Self {
        Self::new(|_| DispatchOutcome::Dispatched)
    }

    /// Holds every submission for `delay` before answering
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Uuid> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DispatchClient for RecordingClient {
    async fn submit(&self, entry: &OutboxEntry) -> DispatchOutcome {
        self.calls.lock().unwrap().push(entry.id);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let outcome = (self.behaviour)(entry);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Polls `condition` until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
