//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use eduvid_media::{check_docker, check_ffmpeg, check_ffprobe, check_manim, MediaResult};
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
    pub renderer: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckStatus {
    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

impl<T: AsRef<std::path::Path>> From<MediaResult<T>> for CheckStatus {
    fn from(result: MediaResult<T>) -> Self {
        match result {
            Ok(path) => Self {
                status: "ok".to_string(),
                path: Some(path.as_ref().display().to_string()),
                error: None,
            },
            Err(e) => Self {
                status: "error".to_string(),
                path: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks that the external tools the pipeline shells out to are installed.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let renderer = if state.runner.config().manim_docker_image.is_some() {
        check_docker()
    } else {
        check_manim()
    };

    let checks = ReadinessChecks {
        ffmpeg: check_ffmpeg().into(),
        ffprobe: check_ffprobe().into(),
        renderer: renderer.into(),
    };
    let ready = checks.ffmpeg.is_ok() && checks.ffprobe.is_ok() && checks.renderer.is_ok();

    let response = ReadinessResponse { ready, checks };

    if ready {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
