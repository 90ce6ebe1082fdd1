//! Job submission.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use eduvid_models::{is_valid_project_name, GenerateRequest, GenerateResponse, Job, JobStatus};
use tracing::info;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create a job and start its pipeline in the background.
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<GenerateResponse>)> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    if request.description.trim().is_empty() {
        return Err(ApiError::bad_request("Description is required"));
    }
    request.validate()?;

    if let Some(name) = &request.project_name {
        if !is_valid_project_name(name) {
            return Err(ApiError::bad_request(
                "project_name may only contain letters, digits, '_' and '-'",
            ));
        }
    }

    let job = Job::new(request.description.trim(), request.project_name)
        .with_subtitles(request.add_subtitles.unwrap_or(true));

    info!(
        job_id = %job.id,
        project = %job.project_name,
        subtitles = job.add_subtitles,
        "Accepted generation request"
    );

    let job_id = state.runner.submit(job).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            job_id: job_id.to_string(),
            status: JobStatus::Queued,
            message: "Video generation started".to_string(),
        }),
    ))
}
