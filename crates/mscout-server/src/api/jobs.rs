use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mscout_core::{JobSettings, JobType};
use mscout_db::CollectionJobRow;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CreateJobRequest {
    pub user_id: i64,
    pub job_type: String,
    #[serde(default)]
    pub input_data: serde_json::Value,
    #[serde(default = "empty_object")]
    pub settings: serde_json::Value,
}

/// `Value::default()` is `null`, which `JobSettings` rejects; an omitted
/// settings field must act like `{}`.
fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Deserialize)]
pub(super) struct JobsQuery {
    pub user_id: i64,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct JobItem {
    job_id: Uuid,
    user_id: i64,
    job_type: String,
    status: String,
    progress: i32,
    total_items: i32,
    success_count: i32,
    error_count: i32,
    results: serde_json::Value,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    duration_seconds: Option<i64>,
}

impl From<CollectionJobRow> for JobItem {
    fn from(row: CollectionJobRow) -> Self {
        Self {
            job_id: row.public_id,
            user_id: row.user_id,
            job_type: row.job_type,
            status: row.status,
            progress: row.progress,
            total_items: row.total_items,
            success_count: row.success_count,
            error_count: row.error_count,
            results: row.results,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_seconds: row.duration_seconds,
        }
    }
}

/// Number of items a job will walk, derived from its input payload.
fn count_input_items(job_type: JobType, input_data: &serde_json::Value) -> Result<i32, String> {
    match job_type {
        JobType::SingleAsin => {
            if input_data.get("asin").and_then(serde_json::Value::as_str).is_none() {
                return Err("input_data.asin is required for SINGLE_ASIN jobs".to_string());
            }
            Ok(1)
        }
        JobType::Url => {
            if input_data.get("url").and_then(serde_json::Value::as_str).is_none() {
                return Err("input_data.url is required for URL jobs".to_string());
            }
            Ok(1)
        }
        JobType::Keyword | JobType::Category | JobType::Bulk => {
            let asins = input_data
                .get("asins")
                .and_then(serde_json::Value::as_array)
                .ok_or_else(|| "input_data.asins is required".to_string())?;
            i32::try_from(asins.len()).map_err(|_| "too many items".to_string())
        }
    }
}

pub(super) async fn create_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateJobRequest>,
) -> Result<Json<ApiResponse<JobItem>>, ApiError> {
    let job_type = JobType::parse(&body.job_type).ok_or_else(|| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!("unknown job type '{}'", body.job_type),
        )
    })?;

    // Reject malformed settings here rather than at run time.
    serde_json::from_value::<JobSettings>(body.settings.clone()).map_err(|e| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!("invalid settings: {e}"),
        )
    })?;

    let total_items = count_input_items(job_type, &body.input_data)
        .map_err(|msg| ApiError::new(req_id.0.clone(), "validation_error", msg))?;

    let row = mscout_db::create_job(
        &state.pool,
        mscout_db::NewJob {
            user_id: body.user_id,
            job_type,
            input_data: body.input_data,
            settings: body.settings,
            total_items,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(job_id = %row.public_id, job_type = %row.job_type, total_items, "job queued");

    Ok(Json(ApiResponse {
        data: JobItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<ApiResponse<Vec<JobItem>>>, ApiError> {
    let rows =
        mscout_db::list_jobs_for_user(&state.pool, query.user_id, normalize_limit(query.limit))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(JobItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(public_id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobItem>>, ApiError> {
    let row = mscout_db::get_job_by_public_id(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "job not found"))?;

    Ok(Json(ApiResponse {
        data: JobItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn cancel_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(public_id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobItem>>, ApiError> {
    let existing = mscout_db::get_job_by_public_id(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "job not found"))?;

    let cancelled = mscout_db::cancel_pending_job(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if !cancelled {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            format!(
                "only pending jobs can be cancelled (job is {})",
                existing.status
            ),
        ));
    }

    let row = mscout_db::get_job_by_public_id(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "job not found"))?;

    Ok(Json(ApiResponse {
        data: JobItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_asin_jobs_count_one_item() {
        let input = serde_json::json!({ "asin": "B000TEST01" });
        assert_eq!(count_input_items(JobType::SingleAsin, &input), Ok(1));
    }

    #[test]
    fn bulk_jobs_count_the_list() {
        let input = serde_json::json!({ "asins": ["a", "b", "c"] });
        assert_eq!(count_input_items(JobType::Bulk, &input), Ok(3));
        assert_eq!(
            count_input_items(JobType::Bulk, &serde_json::json!({ "asins": [] })),
            Ok(0)
        );
    }

    #[test]
    fn missing_input_fields_are_rejected() {
        assert!(count_input_items(JobType::SingleAsin, &serde_json::json!({})).is_err());
        assert!(count_input_items(JobType::Url, &serde_json::json!({})).is_err());
        assert!(count_input_items(JobType::Bulk, &serde_json::json!({})).is_err());
    }
}
