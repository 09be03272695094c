//! Database operations for the `collection_jobs` queue.
//!
//! Transitions are guarded by conditional UPDATEs on `status`, so two
//! workers racing for the same job resolve at the database without locks.
//! Counters and results are flushed per item in a single statement; the
//! table's CHECK constraints hold at every observable point.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use mscout_core::{ItemResult, JobType};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `collection_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionJobRow {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: i64,
    pub job_type: String,
    pub input_data: serde_json::Value,
    pub settings: serde_json::Value,
    pub status: String,
    pub progress: i32,
    pub total_items: i32,
    pub success_count: i32,
    pub error_count: i32,
    pub results: serde_json::Value,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: i64,
    pub job_type: JobType,
    pub input_data: serde_json::Value,
    pub settings: serde_json::Value,
    pub total_items: i32,
}

const JOB_COLUMNS: &str = "id, public_id, user_id, job_type, input_data, settings, status, \
     progress, total_items, success_count, error_count, results, error_message, \
     started_at, completed_at, duration_seconds, created_at";

// ---------------------------------------------------------------------------
// Creation and lookup
// ---------------------------------------------------------------------------

/// Creates a job in `PENDING` status with a fresh public id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_job(pool: &PgPool, new_job: NewJob) -> Result<CollectionJobRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, CollectionJobRow>(&format!(
        "INSERT INTO collection_jobs \
             (public_id, user_id, job_type, input_data, settings, total_items) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(public_id)
    .bind(new_job.user_id)
    .bind(new_job.job_type.as_str())
    .bind(&new_job.input_data)
    .bind(&new_job.settings)
    .bind(new_job.total_items)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_job(pool: &PgPool, id: i64) -> Result<Option<CollectionJobRow>, DbError> {
    let row = sqlx::query_as::<_, CollectionJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM collection_jobs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_job_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<Option<CollectionJobRow>, DbError> {
    let row = sqlx::query_as::<_, CollectionJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM collection_jobs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists a user's jobs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_jobs_for_user(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<CollectionJobRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectionJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM collection_jobs \
         WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Lists `PENDING` jobs, oldest first, for queue draining.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pending_jobs(pool: &PgPool, limit: i64) -> Result<Vec<CollectionJobRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectionJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM collection_jobs \
         WHERE status = 'PENDING' ORDER BY created_at ASC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Lifecycle transitions
// ---------------------------------------------------------------------------

/// Claims a `PENDING` job for processing: one compare-and-set UPDATE that
/// flips it to `PROCESSING` and stamps `started_at`.
///
/// Returns `false` when another worker won the race. That is a normal
/// outcome, not an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn claim_job(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE collection_jobs \
         SET status = 'PROCESSING', started_at = NOW(), progress = 0 \
         WHERE id = $1 AND status = 'PENDING'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Records one item's outcome: a single UPDATE that bumps `progress`,
/// exactly one of the success/error counters, and appends to `results`.
/// Flushed per item so a poll mid-run sees consistent counters.
///
/// # Errors
///
/// - [`DbError::InvalidJobTransition`] if the job is not `PROCESSING`.
/// - [`DbError::Sqlx`] if the update fails.
pub async fn record_item_result(
    pool: &PgPool,
    id: i64,
    item: &ItemResult,
) -> Result<(), DbError> {
    let succeeded = matches!(item.outcome, mscout_core::ItemOutcome::Success);

    let result = sqlx::query(
        "UPDATE collection_jobs \
         SET progress = progress + 1, \
             success_count = success_count + CASE WHEN $1 THEN 1 ELSE 0 END, \
             error_count = error_count + CASE WHEN $1 THEN 0 ELSE 1 END, \
             results = results || $2 \
         WHERE id = $3 AND status = 'PROCESSING'",
    )
    .bind(succeeded)
    .bind(Json(item))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "PROCESSING",
        });
    }

    Ok(())
}

/// Marks a `PROCESSING` job `COMPLETED`, stamping `completed_at` and the
/// run duration.
///
/// # Errors
///
/// - [`DbError::InvalidJobTransition`] if the job is not `PROCESSING`.
/// - [`DbError::Sqlx`] if a query fails.
pub async fn complete_job(pool: &PgPool, id: i64) -> Result<(), DbError> {
    finish_job(pool, id, "COMPLETED", None).await
}

/// Marks a `PROCESSING` job `FAILED` with an error message.
///
/// # Errors
///
/// - [`DbError::InvalidJobTransition`] if the job is not `PROCESSING`.
/// - [`DbError::Sqlx`] if a query fails.
pub async fn fail_job(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    finish_job(pool, id, "FAILED", Some(error_message)).await
}

async fn finish_job(
    pool: &PgPool,
    id: i64,
    status: &str,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let started_at: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT started_at FROM collection_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .flatten();

    let completed_at = Utc::now();
    let duration_seconds = run_duration_secs(id, started_at, completed_at);

    let result = sqlx::query(
        "UPDATE collection_jobs \
         SET status = $1, completed_at = $2, duration_seconds = $3, \
             error_message = COALESCE($4, error_message) \
         WHERE id = $5 AND status = 'PROCESSING'",
    )
    .bind(status)
    .bind(completed_at)
    .bind(duration_seconds)
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "PROCESSING",
        });
    }

    Ok(())
}

/// Whole-second run duration, clamped to a minimum of 1. A negative span
/// means the database clock and this host disagree; it is logged and
/// clamped rather than persisted (the table rejects negative durations).
fn run_duration_secs(
    id: i64,
    started_at: Option<DateTime<Utc>>,
    completed_at: DateTime<Utc>,
) -> Option<i64> {
    let started_at = started_at?;
    let secs = (completed_at - started_at).num_seconds();
    if secs < 1 {
        if secs < 0 {
            tracing::warn!(
                job_id = id,
                started_at = %started_at,
                completed_at = %completed_at,
                "job duration was negative, clamping to 1s (clock skew?)"
            );
        }
        return Some(1);
    }
    Some(secs)
}

/// Unconditionally fails a job that is still `PENDING` or `PROCESSING`.
/// Last-resort hook for when the normal failure path itself failed; a job
/// already in a terminal state is left untouched.
///
/// Returns whether a row was updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn force_fail_job(pool: &PgPool, id: i64, error_message: &str) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE collection_jobs \
         SET status = 'FAILED', error_message = $1, completed_at = NOW(), \
             duration_seconds = CASE \
                 WHEN started_at IS NULL THEN NULL \
                 ELSE GREATEST(EXTRACT(EPOCH FROM (NOW() - started_at))::BIGINT, 1) \
             END \
         WHERE id = $2 AND status IN ('PENDING', 'PROCESSING')",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Cancels a job that has not started yet. Only `PENDING` jobs can be
/// cancelled; anything already claimed runs to completion.
///
/// Returns whether a row was cancelled.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn cancel_pending_job(pool: &PgPool, public_id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE collection_jobs \
         SET status = 'CANCELLED', completed_at = NOW() \
         WHERE public_id = $1 AND status = 'PENDING'",
    )
    .bind(public_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

// ---------------------------------------------------------------------------
// Sweeps and retention
// ---------------------------------------------------------------------------

/// Fails `PROCESSING` jobs whose worker has gone away: started more than
/// `stale_after_mins` ago, or claimed without a start timestamp at all.
///
/// Returns the number of jobs swept.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn sweep_stale_processing(pool: &PgPool, stale_after_mins: i64) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE collection_jobs \
         SET status = 'FAILED', \
             error_message = 'processing timed out', \
             completed_at = NOW(), \
             duration_seconds = CASE \
                 WHEN started_at IS NULL THEN NULL \
                 ELSE GREATEST(EXTRACT(EPOCH FROM (NOW() - started_at))::BIGINT, 1) \
             END \
         WHERE status = 'PROCESSING' \
           AND (started_at IS NULL OR started_at < NOW() - make_interval(mins => $1::INT))",
    )
    .bind(stale_after_mins)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Fails `PENDING` jobs that no worker picked up within
/// `retention_mins`.
///
/// Returns the number of jobs swept.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn fail_stale_pending(pool: &PgPool, retention_mins: i64) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE collection_jobs \
         SET status = 'FAILED', \
             error_message = 'timed out before processing started', \
             completed_at = NOW() \
         WHERE status = 'PENDING' \
           AND created_at < NOW() - make_interval(mins => $1::INT)",
    )
    .bind(retention_mins)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Deletes `FAILED` jobs older than `older_than_hours`.
///
/// Returns the number of jobs deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn prune_failed_jobs(pool: &PgPool, older_than_hours: i64) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM collection_jobs \
         WHERE status = 'FAILED' \
           AND COALESCE(completed_at, created_at) < NOW() - make_interval(hours => $1::INT)",
    )
    .bind(older_than_hours)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
