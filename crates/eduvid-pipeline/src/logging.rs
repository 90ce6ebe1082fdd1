//! Structured job logging.

use eduvid_models::{JobId, StageName};
use tracing::{error, info, warn, Span};

/// Logs job lifecycle events with the job id and project attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    project: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, project: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            project: project.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            project = %self.project,
            "Job started: {}", message
        );
    }

    pub fn log_stage_start(&self, stage: StageName) {
        info!(
            job_id = %self.job_id,
            stage = %stage,
            "Stage started: {}", stage.title()
        );
    }

    pub fn log_stage_done(&self, stage: StageName, artifact: &str, elapsed_secs: f64) {
        info!(
            job_id = %self.job_id,
            stage = %stage,
            elapsed_secs,
            "Stage finished: {}", artifact
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            project = %self.project,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            project = %self.project,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            project = %self.project,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span wrapping the whole pipeline run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, project = %self.project)
    }
}
