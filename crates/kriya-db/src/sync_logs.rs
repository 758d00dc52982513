//! Database operations for `sync_logs`.
//!
//! One row per import run. The partial unique index
//! `sync_logs_one_running_per_store` allows a single `running` row per store,
//! which is what serializes imports across processes.

use chrono::{DateTime, Utc};
use kriya_core::SyncStatus;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{is_unique_violation, DbError};

/// A row from the `sync_logs` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SyncLogRow {
    pub id: Uuid,
    pub store_id: Uuid,
    pub status: String,
    pub products_synced: i32,
    pub categories_synced: i32,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncLogRow {
    /// Parsed status; the column is constrained, so `None` only follows a
    /// schema change.
    #[must_use]
    pub fn sync_status(&self) -> Option<SyncStatus> {
        self.status.parse().ok()
    }
}

const SYNC_LOG_COLUMNS: &str = "id, store_id, status, products_synced, categories_synced, \
     error_message, duration_ms, created_at, completed_at";

/// Marks `running` logs older than `stale_after_secs` as `failed`, freeing the
/// store for a new run after a crashed or abandoned import.
///
/// Returns the number of reclaimed rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn reclaim_stale_sync_logs(
    pool: &PgPool,
    store_id: Uuid,
    stale_after_secs: u64,
) -> Result<u64, DbError> {
    let secs = i64::try_from(stale_after_secs).unwrap_or(i64::MAX);
    let result = sqlx::query(
        "UPDATE sync_logs \
         SET status = $3, completed_at = NOW(), \
             error_message = 'abandoned: exceeded stale timeout' \
         WHERE store_id = $1 AND status = $4 \
           AND created_at < NOW() - make_interval(secs => $2::double precision)",
    )
    .bind(store_id)
    .bind(secs)
    .bind(SyncStatus::Failed.as_str())
    .bind(SyncStatus::Running.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Inserts a `running` log for the store.
///
/// # Errors
///
/// Returns [`DbError::SyncAlreadyRunning`] when another run holds the store,
/// or [`DbError::Sqlx`] for any other failure.
pub async fn start_sync_log(pool: &PgPool, store_id: Uuid) -> Result<SyncLogRow, DbError> {
    let result = sqlx::query_as::<_, SyncLogRow>(&format!(
        "INSERT INTO sync_logs (id, store_id, status) VALUES ($1, $2, $3) \
         RETURNING {SYNC_LOG_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(store_id)
    .bind(SyncStatus::Running.as_str())
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(e) if is_unique_violation(&e) => Err(DbError::SyncAlreadyRunning { store_id }),
        Err(e) => Err(DbError::Sqlx(e)),
    }
}

/// Marks a `running` log `completed` with its counts and duration.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncTransition`] if the log is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_sync_log(
    pool: &PgPool,
    id: Uuid,
    products_synced: i32,
    categories_synced: i32,
    duration_ms: i64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_logs \
         SET status = $5, completed_at = NOW(), \
             products_synced = $2, categories_synced = $3, duration_ms = $4 \
         WHERE id = $1 AND status = $6",
    )
    .bind(id)
    .bind(products_synced)
    .bind(categories_synced)
    .bind(duration_ms)
    .bind(SyncStatus::Completed.as_str())
    .bind(SyncStatus::Running.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncTransition {
            id,
            expected_status: SyncStatus::Running.as_str(),
        });
    }

    Ok(())
}

/// Marks a `running` log `failed` with the error message and duration.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncTransition`] if the log is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_sync_log(
    pool: &PgPool,
    id: Uuid,
    error_message: &str,
    duration_ms: i64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_logs \
         SET status = $4, completed_at = NOW(), error_message = $2, duration_ms = $3 \
         WHERE id = $1 AND status = $5",
    )
    .bind(id)
    .bind(error_message)
    .bind(duration_ms)
    .bind(SyncStatus::Failed.as_str())
    .bind(SyncStatus::Running.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncTransition {
            id,
            expected_status: SyncStatus::Running.as_str(),
        });
    }

    Ok(())
}

/// Returns the store's most recent `limit` logs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_logs(
    pool: &PgPool,
    store_id: Uuid,
    limit: i64,
) -> Result<Vec<SyncLogRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncLogRow>(&format!(
        "SELECT {SYNC_LOG_COLUMNS} FROM sync_logs \
         WHERE store_id = $1 \
         ORDER BY created_at DESC, id \
         LIMIT $2"
    ))
    .bind(store_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
