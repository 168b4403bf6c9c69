//! In-memory outbox repository
//!
//! Keeps entries in creation order behind a mutex. Every operation runs
//! entirely under the lock, which gives claims the same per-row atomicity the
//! database provides. Used by tests and by embedders without a database;
//! long-running embedders should enable `terminal_retention` (or call
//! `purge_terminal`) so finished entries do not pile up.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::domain::entry::{OutboxEntry, OutboxStatus};
use courier_core::domain::retry::RetryPolicy;
use courier_core::dto::entry::NewOutboxEntry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

use super::OutboxRepository;
use crate::error::{StoreError, StoreResult};

#[derive(Default)]
struct State {
    /// Insertion order doubles as creation order
    entries: Vec<OutboxEntry>,
    unavailable: bool,
}

impl State {
    /// The entry, if it is still `processing` under `claimed_by`
    fn claimed_mut(&mut self, id: Uuid, claimed_by: &str) -> Option<&mut OutboxEntry> {
        self.entries.iter_mut().find(|e| {
            e.id == id
                && e.status == OutboxStatus::Processing
                && e.claimed_by.as_deref() == Some(claimed_by)
        })
    }
}

fn pending_entry(req: NewOutboxEntry, now: DateTime<Utc>) -> OutboxEntry {
    OutboxEntry {
        id: Uuid::new_v4(),
        created_at: now,
        kind: req.kind,
        payload: req.payload,
        correlation_id: req.correlation_id,
        status: OutboxStatus::Pending,
        attempt_count: 0,
        last_error: None,
        processed_at: None,
        next_attempt_at: None,
        claimed_at: None,
        claimed_by: None,
    }
}

/// `now - older_than`, or `None` when that lies before any representable time
fn cutoff_before(older_than: Duration) -> Option<DateTime<Utc>> {
    chrono::TimeDelta::from_std(older_than)
        .ok()
        .and_then(|age| Utc::now().checked_sub_signed(age))
}

/// Thread-safe in-memory outbox
#[derive(Clone, Default)]
pub struct InMemoryOutboxRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryOutboxRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn available(&self) -> StoreResult<MutexGuard<'_, State>> {
        let state = self.lock();
        if state.unavailable {
            return Err(StoreError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(state)
    }

    /// Writes a pending entry, as the workflow engine would
    pub fn enqueue(&self, req: NewOutboxEntry) -> OutboxEntry {
        let entry = pending_entry(req, Utc::now());
        self.lock().entries.push(entry.clone());
        entry
    }

    /// Writes several pending entries atomically, claimable in the given order
    pub fn enqueue_many(&self, reqs: Vec<NewOutboxEntry>) -> Vec<OutboxEntry> {
        let now = Utc::now();
        let entries: Vec<OutboxEntry> = reqs.into_iter().map(|req| pending_entry(req, now)).collect();
        self.lock().entries.extend(entries.iter().cloned());
        entries
    }

    /// Snapshot of one entry
    pub fn get(&self, id: Uuid) -> Option<OutboxEntry> {
        self.lock().entries.iter().find(|e| e.id == id).cloned()
    }

    /// Snapshot of every entry in creation order
    pub fn entries(&self) -> Vec<OutboxEntry> {
        self.lock().entries.clone()
    }

    pub fn count_by_status(&self, status: OutboxStatus) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.status == status)
            .count()
    }

    /// Makes every trait call fail with `StoreError::Unavailable` until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }
}

#[async_trait]
impl OutboxRepository for InMemoryOutboxRepository {
    async fn claim_batch(&self, limit: usize, claimed_by: &str) -> StoreResult<Vec<OutboxEntry>> {
        let mut state = self.available()?;
        let now = Utc::now();

        let mut claimable: Vec<usize> = state
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.status == OutboxStatus::Pending && e.next_attempt_at.is_none_or(|at| at <= now)
            })
            .map(|(i, _)| i)
            .collect();
        // Stable: equal timestamps keep insertion order
        claimable.sort_by_key(|&i| state.entries[i].created_at);
        claimable.truncate(limit);

        let mut claimed = Vec::with_capacity(claimable.len());
        for i in claimable {
            let entry = &mut state.entries[i];
            entry.status = OutboxStatus::Processing;
            entry.claimed_at = Some(now);
            entry.claimed_by = Some(claimed_by.to_string());
            claimed.push(entry.clone());
        }

        Ok(claimed)
    }

    async fn mark_processed(&self, id: Uuid, claimed_by: &str) -> StoreResult<bool> {
        let mut state = self.available()?;
        let Some(entry) = state.claimed_mut(id, claimed_by) else {
            return Ok(false);
        };

        entry.status = OutboxStatus::Processed;
        entry.processed_at = Some(Utc::now());
        entry.attempt_count += 1;
        entry.next_attempt_at = None;
        Ok(true)
    }

    async fn mark_retry(
        &self,
        id: Uuid,
        claimed_by: &str,
        error: &str,
        policy: &RetryPolicy,
    ) -> StoreResult<Option<OutboxStatus>> {
        let mut state = self.available()?;
        let Some(entry) = state.claimed_mut(id, claimed_by) else {
            return Ok(None);
        };

        entry.attempt_count += 1;
        entry.last_error = Some(error.to_string());
        entry.claimed_at = None;
        entry.claimed_by = None;

        if policy.is_exhausted(entry.attempt_count) {
            entry.status = OutboxStatus::Failed;
            entry.next_attempt_at = None;
        } else {
            entry.status = OutboxStatus::Pending;
            entry.next_attempt_at = Some(policy.next_attempt_at(entry.attempt_count, Utc::now()));
        }

        Ok(Some(entry.status))
    }

    async fn mark_failed(&self, id: Uuid, claimed_by: &str, error: &str) -> StoreResult<bool> {
        let mut state = self.available()?;
        let Some(entry) = state.claimed_mut(id, claimed_by) else {
            return Ok(false);
        };

        entry.status = OutboxStatus::Failed;
        entry.attempt_count += 1;
        entry.last_error = Some(error.to_string());
        entry.next_attempt_at = None;
        entry.claimed_at = None;
        entry.claimed_by = None;
        Ok(true)
    }

    async fn reclaim_stale(&self, older_than: Duration) -> StoreResult<u64> {
        let mut state = self.available()?;
        let Some(cutoff) = cutoff_before(older_than) else {
            return Ok(0);
        };

        let mut reclaimed = 0;
        for entry in state.entries.iter_mut() {
            if entry.status == OutboxStatus::Processing
                && entry.claimed_at.is_some_and(|at| at < cutoff)
            {
                entry.status = OutboxStatus::Pending;
                entry.last_error = Some("claim expired".to_string());
                entry.claimed_at = None;
                entry.claimed_by = None;
                reclaimed += 1;
            }
        }

        Ok(reclaimed)
    }

    async fn purge_terminal(&self, older_than: Duration) -> StoreResult<u64> {
        let mut state = self.available()?;
        let Some(cutoff) = cutoff_before(older_than) else {
            return Ok(0);
        };

        let before = state.entries.len();
        // Failed entries carry no completion time; fall back to creation
        state.entries.retain(|e| {
            !(e.is_terminal() && e.processed_at.unwrap_or(e.created_at) < cutoff)
        });
        Ok((before - state.entries.len()) as u64)
    }
}
