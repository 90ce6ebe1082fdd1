//! Final video download.

use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use eduvid_models::{JobId, JobStatus};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Stream the finished mp4 as an attachment named after the project.
pub async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job = state
        .store()
        .get(&JobId::from_string(job_id))
        .await
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if job.status != JobStatus::Completed {
        return Err(ApiError::bad_request("Video not ready yet"));
    }

    let path = job
        .final_video()
        .map(PathBuf::from)
        .ok_or_else(|| ApiError::not_found("Video file not found"))?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(job_id = %job.id, path = %path.display(), "Final video missing on disk");
            return Err(ApiError::not_found("Video file not found"));
        }
        Err(e) => return Err(e.into()),
    };
    let size = file.metadata().await?.len();

    info!(job_id = %job.id, bytes = size, "Serving final video");

    let disposition = format!("attachment; filename=\"{}.mp4\"", job.project_name);
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
