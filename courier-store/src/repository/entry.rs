//! Outbox Entry Repository
//!
//! Row-level operations on `outbox_entries`. Every status transition is a
//! single conditional `UPDATE`, so concurrent processors never race on a row.

use chrono::{DateTime, Utc};
use courier_core::domain::entry::{OutboxEntry, OutboxStatus};
use courier_core::domain::retry::RetryPolicy;
use courier_core::dto::entry::NewOutboxEntry;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

// =============================================================================
// Producer side
// =============================================================================

/// Insert a pending entry
///
/// Takes a connection rather than a pool so the workflow engine can write the
/// row inside the transaction that commits its state transition:
/// `entry::insert(&mut *tx, &new_entry)`.
pub async fn insert(conn: &mut PgConnection, req: &NewOutboxEntry) -> Result<OutboxEntry, sqlx::Error> {
    let entry = OutboxEntry {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        kind: req.kind.clone(),
        payload: req.payload.clone(),
        correlation_id: req.correlation_id.clone(),
        status: OutboxStatus::Pending,
        attempt_count: 0,
        last_error: None,
        processed_at: None,
        next_attempt_at: None,
        claimed_at: None,
        claimed_by: None,
    };

    sqlx::query(
        r#"
        INSERT INTO outbox_entries (id, created_at, kind, payload, correlation_id, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(entry.id)
    .bind(entry.created_at)
    .bind(&entry.kind)
    .bind(&entry.payload)
    .bind(&entry.correlation_id)
    .bind(OutboxStatus::Pending.as_str())
    .execute(conn)
    .await?;

    Ok(entry)
}

// =============================================================================
// Processor side
// =============================================================================

/// Atomically claim up to `limit` pending entries, oldest first
///
/// Rows locked by a concurrent claimant are skipped, so racing callers get
/// disjoint sets. Only the rows flipped to `processing` are returned.
pub async fn claim_batch(
    pool: &PgPool,
    limit: usize,
    claimed_by: &str,
) -> Result<Vec<OutboxEntry>, sqlx::Error> {
    let now = Utc::now();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let rows = sqlx::query_as::<_, EntryRow>(
        r#"
        WITH claimable AS (
            SELECT id FROM outbox_entries
            WHERE status = 'pending'
              AND (next_attempt_at IS NULL OR next_attempt_at <= $1)
            ORDER BY created_at ASC
            LIMIT $2
            FOR UPDATE SKIP LOCKED
        )
        UPDATE outbox_entries AS e
        SET status = 'processing', claimed_at = $1, claimed_by = $3
        FROM claimable
        WHERE e.id = claimable.id
        RETURNING e.id, e.created_at, e.kind, e.payload, e.correlation_id, e.status,
                  e.attempt_count, e.last_error, e.processed_at, e.next_attempt_at,
                  e.claimed_at, e.claimed_by
        "#,
    )
    .bind(now)
    .bind(limit)
    .bind(claimed_by)
    .fetch_all(pool)
    .await?;

    // RETURNING order is unspecified
    let mut entries: Vec<OutboxEntry> = rows.into_iter().map(|r| r.into()).collect();
    entries.sort_by_key(|e| e.created_at);
    Ok(entries)
}

/// Mark a claimed entry as dispatched
///
/// Returns `false` if the entry is no longer `processing` under
/// `claimed_by` (already processed, re-queued, swept and claimed by someone
/// else, or unknown), which makes repeated or late calls harmless.
pub async fn mark_processed(pool: &PgPool, id: Uuid, claimed_by: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE outbox_entries
        SET status = 'processed', processed_at = $1, attempt_count = attempt_count + 1,
            next_attempt_at = NULL
        WHERE id = $2 AND status = 'processing' AND claimed_by = $3
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .bind(claimed_by)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Record a transient failure for a claimed entry
///
/// The row is locked while the next attempt time is computed from the
/// policy. Returns the resulting status, or `None` if the entry is no longer
/// `processing` under `claimed_by`.
pub async fn mark_retry(
    pool: &PgPool,
    id: Uuid,
    claimed_by: &str,
    error: &str,
    policy: &RetryPolicy,
) -> Result<Option<OutboxStatus>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let previous: Option<i32> = sqlx::query_scalar(
        r#"
        SELECT attempt_count FROM outbox_entries
        WHERE id = $1 AND status = 'processing' AND claimed_by = $2
        FOR UPDATE
        "#,
    )
    .bind(id)
    .bind(claimed_by)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(previous) = previous else {
        return Ok(None);
    };

    let transition = RetryTransition::after(previous, policy, Utc::now());

    sqlx::query(
        r#"
        UPDATE outbox_entries
        SET status = $2, attempt_count = $3, last_error = $4, next_attempt_at = $5,
            claimed_at = NULL, claimed_by = NULL
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(transition.status.as_str())
    .bind(transition.attempt_count)
    .bind(error)
    .bind(transition.next_attempt_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(transition.status))
}

/// Record a permanent failure for a claimed entry, regardless of budget
pub async fn mark_failed(
    pool: &PgPool,
    id: Uuid,
    claimed_by: &str,
    error: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE outbox_entries
        SET status = 'failed', attempt_count = attempt_count + 1, last_error = $1,
            next_attempt_at = NULL, claimed_at = NULL, claimed_by = NULL
        WHERE id = $2 AND status = 'processing' AND claimed_by = $3
        "#,
    )
    .bind(error)
    .bind(id)
    .bind(claimed_by)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Return entries stuck in `processing` since before `cutoff` to `pending`
pub async fn reclaim_stale(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE outbox_entries
        SET status = 'pending', last_error = 'claim expired', claimed_at = NULL, claimed_by = NULL
        WHERE status = 'processing' AND claimed_at < $1
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete `processed` and `failed` entries that finished before `cutoff`
///
/// Failed rows carry no completion time, so their age is taken from
/// `created_at`.
pub async fn purge_terminal(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM outbox_entries
        WHERE status IN ('processed', 'failed')
          AND COALESCE(processed_at, created_at) < $1
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Lookups
// =============================================================================

/// Number of entries per status
pub async fn count_by_status(pool: &PgPool) -> Result<Vec<(OutboxStatus, i64)>, sqlx::Error> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM outbox_entries GROUP BY status ORDER BY status")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(status, count)| (string_to_status(&status), count))
        .collect())
}

// =============================================================================
// Helper Functions
// =============================================================================

fn string_to_status(s: &str) -> OutboxStatus {
    // The table's CHECK constraint keeps unknown values out
    s.parse().unwrap_or(OutboxStatus::Pending)
}

/// Column values written by `mark_retry`
#[derive(Debug, PartialEq)]
struct RetryTransition {
    status: OutboxStatus,
    attempt_count: i32,
    next_attempt_at: Option<DateTime<Utc>>,
}

impl RetryTransition {
    /// Outcome of one more failed attempt on a row that had `previous` attempts
    fn after(previous: i32, policy: &RetryPolicy, now: DateTime<Utc>) -> Self {
        let attempts = u32::try_from(previous).unwrap_or(0).saturating_add(1);
        let attempt_count = i32::try_from(attempts).unwrap_or(i32::MAX);

        if policy.is_exhausted(attempts) {
            Self {
                status: OutboxStatus::Failed,
                attempt_count,
                next_attempt_at: None,
            }
        } else {
            Self {
                status: OutboxStatus::Pending,
                attempt_count,
                next_attempt_at: Some(policy.next_attempt_at(attempts, now)),
            }
        }
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    kind: String,
    payload: serde_json::Value,
    correlation_id: String,
    status: String,
    attempt_count: i32,
    last_error: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    next_attempt_at: Option<DateTime<Utc>>,
    claimed_at: Option<DateTime<Utc>>,
    claimed_by: Option<String>,
}

impl From<EntryRow> for OutboxEntry {
    fn from(row: EntryRow) -> Self {
        OutboxEntry {
            id: row.id,
            created_at: row.created_at,
            kind: row.kind,
            payload: row.payload,
            correlation_id: row.correlation_id,
            status: string_to_status(&row.status),
            attempt_count: u32::try_from(row.attempt_count).unwrap_or(0),
            last_error: row.last_error,
            processed_at: row.processed_at,
            next_attempt_at: row.next_attempt_at,
            claimed_at: row.claimed_at,
            claimed_by: row.claimed_by,
        }
    }
}
