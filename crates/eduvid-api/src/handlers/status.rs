//! Job status and listing.

use axum::extract::{Path, State};
use axum::Json;
use eduvid_models::{JobId, JobListResponse, JobSummary, StatusResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Current status of one job.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let job = state
        .store()
        .get(&JobId::from_string(job_id))
        .await
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(StatusResponse::from(&job)))
}

/// All known jobs, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    let jobs = state.store().list().await;
    Json(JobListResponse {
        jobs: jobs.iter().map(JobSummary::from).collect(),
    })
}
