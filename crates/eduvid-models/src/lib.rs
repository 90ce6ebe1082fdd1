//! Shared data models for the EduVid backend.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, their coarse status and accumulated stage results
//! - The fixed, ordered list of generation stages
//! - Scene breakdowns produced by the planning prompt
//! - HTTP request/response bodies shared by the API server and the client

pub mod api;
pub mod job;
pub mod job_status;
pub mod scene;
pub mod stage;

// Re-export common types
pub use api::{
    download_path, is_valid_project_name, GenerateRequest, GenerateResponse, JobListResponse,
    JobSummary, StatusResponse,
};
pub use job::{default_project_name, Job, JobId, JobResults, TransitionError};
pub use job_status::JobStatus;
pub use scene::Scene;
pub use stage::StageName;
