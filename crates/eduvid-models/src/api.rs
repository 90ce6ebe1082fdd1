//! HTTP request/response bodies shared by the API server and the client.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{Job, JobResults, JobStatus, StageName};

/// `POST /api/generate` body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
pub struct GenerateRequest {
    /// Natural-language description of the educational content
    #[validate(length(min = 1, max = 10000))]
    pub description: String,

    /// Optional artifact/download name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 64))]
    pub project_name: Option<String>,

    /// Burn subtitles into the final video (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_subtitles: Option<bool>,
}

impl GenerateRequest {
    /// Create a request with just a description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            project_name: None,
            add_subtitles: None,
        }
    }
}

/// Project names become file names, so only `[A-Za-z0-9_-]` is allowed.
pub fn is_valid_project_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// `POST /api/generate` response (202).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
}

/// `GET /api/status/{job_id}` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub project_name: String,
    /// Stage currently running, while processing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageName>,
    /// Artifacts produced so far (omitted until the first stage finishes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<JobResults>,
    /// Failure reason, when failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Download link, when completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl StatusResponse {
    /// `final_video` artifact, if reported.
    pub fn final_video(&self) -> Option<&str> {
        self.results
            .as_ref()
            .and_then(|r| r.get(StageName::Finalize.artifact_key()))
            .map(String::as_str)
    }
}

impl From<&Job> for StatusResponse {
    fn from(job: &Job) -> Self {
        let completed = job.status == JobStatus::Completed;
        Self {
            job_id: job.id.to_string(),
            status: job.status,
            project_name: job.project_name.clone(),
            current_stage: job.current_stage,
            results: (!job.results.is_empty()).then(|| job.results.clone()),
            error: if job.status == JobStatus::Failed {
                Some(
                    job.error
                        .clone()
                        .unwrap_or_else(|| "Unknown error".to_string()),
                )
            } else {
                None
            },
            download_url: completed.then(|| download_path(job.id.as_str())),
        }
    }
}

/// Relative download URL for a job.
pub fn download_path(job_id: &str) -> String {
    format!("/api/download/{}", job_id)
}

/// Entry of `GET /api/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobSummary {
    pub job_id: String,
    pub status: JobStatus,
    pub project_name: String,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            status: job.status,
            project_name: job.project_name.clone(),
        }
    }
}

/// `GET /api/jobs` response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobListResponse {
    pub jobs: Vec<JobSummary>,
}
