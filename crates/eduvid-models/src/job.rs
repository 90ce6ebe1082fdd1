//! Job records tracked by the job store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{JobStatus, StageName};

/// Artifact references keyed by `StageName::artifact_key`.
pub type JobResults = BTreeMap<String, String>;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Rejected job state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot move job from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("job is {status}, expected processing")]
    NotProcessing { status: JobStatus },

    #[error("Pipeline finished without producing final_video")]
    MissingFinalVideo,
}

/// Default project name: `video_` plus eight hex characters.
pub fn default_project_name() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("video_{}", &hex[..8])
}

/// A video generation job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Natural-language description of the content
    pub description: String,

    /// Prefix for artifact file names and the download name
    pub project_name: String,

    /// Whether subtitles are burned into the final video
    #[serde(default = "default_add_subtitles")]
    pub add_subtitles: bool,

    /// Coarse status
    #[serde(default)]
    pub status: JobStatus,

    /// Stage currently running (only while processing)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageName>,

    /// Artifacts produced so far
    #[serde(default)]
    pub results: JobResults,

    /// Failure reason (only when failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Started at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Completed or failed at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

fn default_add_subtitles() -> bool {
    true
}

impl Job {
    /// Create a new queued job.
    pub fn new(description: impl Into<String>, project_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            description: description.into(),
            project_name: project_name.unwrap_or_else(default_project_name),
            add_subtitles: default_add_subtitles(),
            status: JobStatus::Queued,
            current_stage: None,
            results: JobResults::new(),
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Set whether subtitles are burned in.
    pub fn with_subtitles(mut self, add_subtitles: bool) -> Self {
        self.add_subtitles = add_subtitles;
        self
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Path of the deliverable, once produced.
    pub fn final_video(&self) -> Option<&str> {
        self.results
            .get(StageName::Finalize.artifact_key())
            .map(String::as_str)
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn ensure_processing(&self) -> Result<(), TransitionError> {
        if self.status != JobStatus::Processing {
            return Err(TransitionError::NotProcessing {
                status: self.status,
            });
        }
        Ok(())
    }

    /// `queued -> processing`.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Processing)?;
        self.started_at = Some(self.updated_at);
        Ok(())
    }

    /// Record that `stage` is now running.
    pub fn begin_stage(&mut self, stage: StageName) -> Result<(), TransitionError> {
        self.ensure_processing()?;
        self.current_stage = Some(stage);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Store the artifact produced by `stage`.
    pub fn record_artifact(
        &mut self,
        stage: StageName,
        artifact: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.ensure_processing()?;
        self.results
            .insert(stage.artifact_key().to_string(), artifact.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// `processing -> completed`. Refused while `final_video` is missing.
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.ensure_processing()?;
        if self.final_video().is_none() {
            return Err(TransitionError::MissingFinalVideo);
        }
        self.transition(JobStatus::Completed)?;
        self.current_stage = None;
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    /// Any non-terminal state `-> failed`.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.completed_at = Some(self.updated_at);
        Ok(())
    }
}
